// Middleware modules for the link checker

pub mod cors;

pub use cors::dynamic_cors_middleware;
