//! # Portico Middleware
//!
//! Request pipeline implementation for the Portico edge gateway.
//!
//! Every request that enters the gateway flows through a fixed-order
//! pipeline before it is dispatched to an upstream service:
//!
//! ```text
//! Request -> Correlation -> RateLimit -> Authentication -> Dispatch
//! ```
//!
//! | Stage | Middleware      | Purpose                                        |
//! |-------|-----------------|------------------------------------------------|
//! | 1     | Correlation     | Propagate or mint the correlation ID           |
//! | 2     | Rate Limit      | IP-keyed token bucket, shared store, fail-open |
//! | 3     | Authentication  | Delegate bearer validation to identity service |
//!
//! The order is deliberate: rate limiting runs before authentication so an
//! abusive client cannot burn identity-service capacity, and correlation
//! runs first so both stages log with the request's ID.
//!
//! ## Example
//!
//! ```
//! use portico_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 3);
//! assert_eq!(stages[0].name(), "correlation");
//! assert_eq!(stages[2].name(), "authentication");
//! ```

#![doc(html_root_url = "https://docs.rs/portico-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod client_key;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use context::GatewayContext;
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use stages::{
    AuthFailure, AuthenticationMiddleware, CorrelationMiddleware, HttpTokenValidator,
    RateLimitMiddleware, RoutePolicy, TokenValidator,
};
pub use store::{Admission, MemoryStore, Quota, RateLimitStore, RedisStore, StoreError};
pub use types::{Request, Response, ResponseExt};
