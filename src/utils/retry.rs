// Retry and backoff policy for outbound HTTP lookups

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Coarse classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or read timed out
    Timeout,
    /// Server asked us to slow down (429, 503)
    Throttled,
    /// DNS, refused or reset connections
    Connection,
    /// Retryable server error other than throttling
    Http5xx(u16),
    /// Anything else; never retried
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff with a cap and up to 25% random jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// `attempt` is 1-based. Returns `NoRetry` once the attempt budget is spent.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_) => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                let raw = self.base_delay.saturating_mul(exp).min(self.max_delay);
                RetryDecision::RetryAfter(with_jitter(raw))
            },
        }
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let quarter = delay.as_millis() as u64 / 4;
    if quarter == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=quarter))
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u16) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code),
        _ => ErrorKind::Other,
    }
}

/// Classify a reqwest transport error for retry decisions.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ErrorKind {
    if e.is_timeout() {
        return ErrorKind::Timeout;
    }
    if let Some(status) = e.status() {
        return classify_http_status(status.as_u16());
    }
    if e.is_connect() || e.is_request() {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Run `op` until it succeeds or the policy says stop, sleeping between
/// attempts. `classify` maps each failure to an [`ErrorKind`].
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorKind,
{
    let mut attempt = 1u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.decide(attempt, classify(&e)) {
                RetryDecision::NoRetry => return Err(e),
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            },
        }
    }
}
