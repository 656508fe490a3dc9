//! Per-route fallback responses.
//!
//! When forwarding fails or the circuit breaker is open, the client gets a
//! `503 Service Unavailable` with the standard JSON envelope. Routes with a
//! registered display name get a message naming the service; everything
//! else gets the generic message.

use http::StatusCode;
use portico_core::ErrorBody;
use portico_middleware::{Response, ResponseExt};
use std::collections::HashMap;
use tracing::info;

const GENERIC_MESSAGE: &str =
    "The requested service is temporarily unavailable. Please try again later.";

/// Registry of per-route fallback display names.
#[derive(Debug, Default, Clone)]
pub struct FallbackRegistry {
    names: HashMap<String, String>,
}

impl FallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from route-id to display-name pairs.
    #[must_use]
    pub fn from_names(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Registers a display name for a route.
    pub fn register(&mut self, route_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(route_id.into(), name.into());
    }

    /// Returns the fallback message for a route.
    #[must_use]
    pub fn message_for(&self, route_id: &str) -> String {
        match self.names.get(route_id) {
            Some(name) => {
                format!("{name} is currently unavailable. Please try again later.")
            }
            None => GENERIC_MESSAGE.to_string(),
        }
    }

    /// Builds the 503 fallback response for a route and request path.
    #[must_use]
    pub fn respond(&self, route_id: &str, path: &str) -> Response {
        let message = self.message_for(route_id);
        info!(route_id, path, "serving fallback response");
        let body = ErrorBody::new(StatusCode::SERVICE_UNAVAILABLE, message, path);
        Response::json_error(&body)
    }
}
