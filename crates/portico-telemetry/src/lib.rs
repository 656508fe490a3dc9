//! Structured logging for the Portico edge gateway.
//!
//! The gateway logs JSON lines in production and human-readable output in
//! development, built on the tracing-subscriber ecosystem. Log records use
//! the standard field names in [`logging::fields`] so that the correlation
//! ID and client key are queryable across every stage.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
