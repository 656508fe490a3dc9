//! # Portico
//!
//! **Edge API gateway for HTTP microservice fleets**
//!
//! Portico sits in front of a set of upstream services and gives every
//! request the same treatment before it reaches them:
//!
//! - **Correlation** - every request carries an `X-Correlation-Id`,
//!   propagated when the client supplies one and minted otherwise
//! - **Rate limiting** - IP-keyed token bucket backed by a shared Redis
//!   store, failing open when the store is down
//! - **Authentication** - bearer tokens validated by a remote identity
//!   service, with the resolved identity forwarded as trusted headers
//! - **Routing** - path-prefix routes matched in declaration order
//! - **Resilience** - per-route circuit breakers and 503 fallbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portico::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = portico::config::load_or_default("portico.toml")?;
//!     config.validate()?;
//!     // build pipeline, dispatcher, and server from the config...
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use portico_core as core;

// Re-export the pipeline
pub use portico_middleware as middleware;

// Re-export routing and forwarding
pub use portico_proxy as proxy;

// Re-export configuration
pub use portico_config as config;

// Re-export telemetry
pub use portico_telemetry as telemetry;

// Re-export the server
pub use portico_server as server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use portico_core::{
        CorrelationId, ErrorBody, ForwardedIdentity, GatewayError, GatewayResult,
        CORRELATION_HEADER, USERNAME_HEADER, USER_ID_HEADER,
    };

    pub use portico_middleware::{
        AuthenticationMiddleware, CorrelationMiddleware, GatewayContext, MemoryStore, Middleware,
        Pipeline, Quota, RateLimitMiddleware, RateLimitStore, RedisStore, RoutePolicy,
    };

    pub use portico_proxy::{
        CircuitBreaker, FallbackRegistry, Forwarder, Route, RouteDispatcher, RouteTable,
    };

    pub use portico_config::GatewayConfig;

    pub use portico_server::{GatewayServer, ServerConfig, ShutdownSignal};
}
