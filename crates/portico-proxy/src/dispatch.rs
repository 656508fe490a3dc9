//! Terminal route dispatcher.
//!
//! Installed as the pipeline's terminal handler. Matches the request
//! against the route table, enforces per-route authentication, consults
//! the route's circuit breaker, and forwards to the upstream with fallback
//! on failure.

use http::StatusCode;
use portico_middleware::{GatewayContext, Request, Response, ResponseExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::breaker::CircuitBreaker;
use crate::diagnostics;
use crate::fallback::FallbackRegistry;
use crate::forward::{ForwardError, Forwarder};
use crate::table::RouteTable;

/// Matches, forwards, and falls back.
pub struct RouteDispatcher {
    table: Arc<RouteTable>,
    forwarder: Forwarder,
    fallbacks: FallbackRegistry,
    breakers: HashMap<String, CircuitBreaker>,
}

impl RouteDispatcher {
    /// Creates a dispatcher with one breaker per route.
    #[must_use]
    pub fn new(
        table: Arc<RouteTable>,
        forwarder: Forwarder,
        fallbacks: FallbackRegistry,
        failure_threshold: u32,
        reset_timeout: Duration,
    ) -> Self {
        let breakers = table
            .routes()
            .iter()
            .map(|route| {
                (
                    route.id.clone(),
                    CircuitBreaker::new(failure_threshold, reset_timeout),
                )
            })
            .collect();

        Self {
            table,
            forwarder,
            fallbacks,
            breakers,
        }
    }

    /// Dispatches a request that has cleared the pipeline.
    pub async fn dispatch(&self, ctx: &GatewayContext, request: Request) -> Response {
        let path = request.uri().path().to_string();

        let Some(route) = self.table.match_route(&path) else {
            error!(
                method = %request.method(),
                path = %path,
                query = request.uri().query().unwrap_or(""),
                "no route matched; check the route table prefixes"
            );
            return diagnostics::not_found(request.method(), request.uri());
        };

        // The pipeline authenticates protected routes; a missing identity
        // here means the request bypassed it somehow.
        if route.requires_auth && ctx.identity().is_none() {
            warn!(route_id = %route.id, path = %path, "protected route reached without identity");
            return Response::empty(StatusCode::UNAUTHORIZED);
        }

        if let Some(breaker) = self.breakers.get(&route.id) {
            if !breaker.allow() {
                return self.fallbacks.respond(&route.id, &path);
            }
        }

        match self.forwarder.forward(ctx, route, request).await {
            Ok(response) => {
                if let Some(breaker) = self.breakers.get(&route.id) {
                    breaker.record_success();
                }
                response
            }
            Err(err) => {
                error!(route_id = %route.id, path = %path, error = %err, "forward failed");
                // Only transport-level failures trip the breaker; an
                // unrelayable response means the upstream is up.
                if matches!(err, ForwardError::Timeout | ForwardError::Connect(_)) {
                    if let Some(breaker) = self.breakers.get(&route.id) {
                        breaker.record_failure();
                    }
                }
                self.fallbacks.respond(&route.id, &path)
            }
        }
    }

    /// Returns the route table.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}
