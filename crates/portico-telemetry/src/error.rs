//! Telemetry errors.

use thiserror::Error;

/// Errors raised while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Logging initialization failed.
    #[error("Logging initialization failed: {0}")]
    LoggingInit(String),
}
