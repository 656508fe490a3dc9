//! Health and readiness probes.
//!
//! `/health` reports liveness and never fails while the process runs.
//! `/ready` reports whether the gateway should receive traffic; it turns
//! unready during graceful shutdown so load balancers stop sending new
//! requests.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Liveness probe state.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    service: String,
    version: String,
}

/// Serialized `/health` response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always `"healthy"` while the process runs.
    pub status: &'static str,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

impl HealthCheck {
    /// Creates a health check for a named service.
    #[must_use]
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
        }
    }

    /// Returns the current health status.
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            service: self.service.clone(),
            version: self.version.clone(),
        }
    }
}

/// Readiness probe state.
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    ready: Arc<AtomicBool>,
}

/// Serialized `/ready` response.
#[derive(Debug, Serialize)]
pub struct ReadinessStatus {
    /// Whether the gateway should receive traffic.
    pub ready: bool,
}

impl ReadinessCheck {
    /// Creates a readiness check, initially ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Sets the readiness flag.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Returns `true` if the gateway should receive traffic.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Returns the current readiness status.
    #[must_use]
    pub fn status(&self) -> ReadinessStatus {
        ReadinessStatus {
            ready: self.is_ready(),
        }
    }
}

impl Default for ReadinessCheck {
    fn default() -> Self {
        Self::new()
    }
}
