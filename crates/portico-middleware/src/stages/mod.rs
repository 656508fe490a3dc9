//! Built-in pipeline stages.

pub mod auth;
pub mod correlation;
pub mod rate_limit;

pub use auth::{AuthFailure, AuthenticationMiddleware, HttpTokenValidator, RoutePolicy, TokenValidator};
pub use correlation::CorrelationMiddleware;
pub use rate_limit::RateLimitMiddleware;
