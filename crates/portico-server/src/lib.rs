//! # Portico Server
//!
//! HTTP server for the Portico edge gateway.
//!
//! The server binds a TCP listener, drives each connection with hyper's
//! HTTP/1 implementation, and hands every request to the gateway pipeline
//! with the route dispatcher as the terminal handler. `/health` and
//! `/ready` are answered directly by the server and never enter the
//! pipeline.
//!
//! Graceful shutdown waits for in-flight connections to drain, bounded by
//! the configured shutdown timeout.

#![doc(html_root_url = "https://docs.rs/portico-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod health;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use health::{HealthCheck, ReadinessCheck};
pub use server::{GatewayServer, ServerError};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
