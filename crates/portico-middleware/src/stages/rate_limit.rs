//! IP-keyed token bucket rate limiting stage.
//!
//! The client key is resolved from `X-Forwarded-For` (first entry) with
//! fallback to the peer address, then admitted against the shared store.
//! Denied requests receive `429 Too Many Requests` with an empty body and a
//! `Retry-After` hint. When the store itself is unreachable the stage
//! either fails open (admit and log) or fails closed (503), per
//! configuration.

use crate::client_key;
use crate::context::GatewayContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::store::{Admission, Quota, RateLimitStore};
use crate::types::{Request, Response, ResponseExt};
use http::{HeaderValue, StatusCode};
use portico_core::{ErrorBody, GatewayError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rate limit response headers.
pub mod headers {
    /// Bucket capacity for the admitted client.
    pub const LIMIT: &str = "x-ratelimit-limit";
    /// Whole tokens remaining after this request.
    pub const REMAINING: &str = "x-ratelimit-remaining";
    /// Standard retry hint on 429 responses.
    pub const RETRY_AFTER: &str = "retry-after";
}

/// Pipeline stage enforcing a per-client token bucket.
pub struct RateLimitMiddleware {
    store: Arc<dyn RateLimitStore>,
    quota: Quota,
    fail_open: bool,
    skip_paths: Vec<String>,
}

impl RateLimitMiddleware {
    /// Creates a builder with the given store.
    #[must_use]
    pub fn builder(store: Arc<dyn RateLimitStore>) -> RateLimitBuilder {
        RateLimitBuilder {
            store,
            quota: Quota::new(20, 10.0),
            fail_open: true,
            skip_paths: vec!["/health".to_string(), "/ready".to_string()],
        }
    }

    fn is_skipped(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|p| p == path)
    }
}

/// Builder for [`RateLimitMiddleware`].
pub struct RateLimitBuilder {
    store: Arc<dyn RateLimitStore>,
    quota: Quota,
    fail_open: bool,
    skip_paths: Vec<String>,
}

impl RateLimitBuilder {
    /// Sets the token bucket quota.
    #[must_use]
    pub const fn quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Whether to admit requests when the store is unreachable.
    #[must_use]
    pub const fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Replaces the set of paths exempt from limiting.
    #[must_use]
    pub fn skip_paths(mut self, paths: Vec<String>) -> Self {
        self.skip_paths = paths;
        self
    }

    /// Builds the middleware.
    #[must_use]
    pub fn build(self) -> RateLimitMiddleware {
        RateLimitMiddleware {
            store: self.store,
            quota: self.quota,
            fail_open: self.fail_open,
            skip_paths: self.skip_paths,
        }
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let path = request.uri().path().to_string();
            if self.is_skipped(&path) {
                return next.run(ctx, request).await;
            }

            let key = client_key::resolve(request.headers(), ctx.peer_addr());
            ctx.set_client_key(key.clone());

            match self.store.admit(&key, self.quota).await {
                Ok(Admission::Allowed { remaining }) => {
                    let mut response = next.run(ctx, request).await;
                    let hdrs = response.headers_mut();
                    hdrs.insert(headers::LIMIT, HeaderValue::from(self.quota.capacity));
                    hdrs.insert(headers::REMAINING, HeaderValue::from(remaining));
                    response
                }
                Ok(Admission::Denied { retry_after }) => {
                    debug!(client_key = %key, "rate limit exceeded");
                    let mut response = Response::empty(StatusCode::TOO_MANY_REQUESTS);
                    let secs = retry_after.as_secs().max(1);
                    let hdrs = response.headers_mut();
                    hdrs.insert(headers::RETRY_AFTER, HeaderValue::from(secs));
                    hdrs.insert(headers::LIMIT, HeaderValue::from(self.quota.capacity));
                    hdrs.insert(headers::REMAINING, HeaderValue::from(0_u32));
                    response
                }
                Err(err) if self.fail_open => {
                    warn!(client_key = %key, error = %err, "rate limit store unavailable, admitting");
                    next.run(ctx, request).await
                }
                Err(err) => {
                    warn!(client_key = %key, error = %err, "rate limit store unavailable, rejecting");
                    let gateway_err =
                        GatewayError::upstream_unavailable(err.to_string(), None::<String>);
                    let body =
                        ErrorBody::new(gateway_err.status_code(), gateway_err.to_string(), &path);
                    Response::json_error(&body)
                }
            }
        })
    }
}
