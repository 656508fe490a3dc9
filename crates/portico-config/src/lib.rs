//! # Portico Config
//!
//! Configuration for the Portico edge gateway.
//!
//! Configuration is read from a TOML file, then selected settings can be
//! overridden through `PORTICO_*` environment variables so the same file
//! works across deployment environments.
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:8080"
//!
//! [auth]
//! validate_url = "http://identity:8090/auth/validate"
//!
//! [rate_limit]
//! capacity = 20
//! refill_per_sec = 10.0
//!
//! [[routes]]
//! id = "order"
//! prefix = "/order"
//! target = "http://order-service:8081"
//! requires_auth = true
//! fallback = "Order Service"
//! ```

#![doc(html_root_url = "https://docs.rs/portico-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    AuthSection, BreakerSection, GatewayConfig, LoggingSection, RateLimitSection, RouteSection,
    ServerSection, TelemetrySection,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_or_default};
