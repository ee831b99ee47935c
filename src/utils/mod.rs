// Utility modules for the link checker

pub mod retry;
pub mod service_error;
pub mod url_validator;

pub use retry::{ErrorKind, RetryDecision, RetryPolicy};
pub use service_error::ServiceError;
pub use url_validator::{TargetUrl, ValidationError};
