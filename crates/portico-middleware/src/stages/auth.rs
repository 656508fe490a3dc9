//! Bearer-token authentication stage.
//!
//! Token validation is delegated to a remote identity endpoint. On success
//! the identity service responds with `userId` and `username` headers, which
//! the gateway injects into the forwarded request as trusted identity
//! headers. Those same header names are always stripped from inbound
//! requests first, so a client can never impersonate another user by
//! sending them directly.

use crate::context::GatewayContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use http::{HeaderValue, StatusCode};
use portico_core::{
    CorrelationId, ErrorBody, ForwardedIdentity, GatewayError, CORRELATION_HEADER,
    USERNAME_HEADER, USER_ID_HEADER,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decides which request paths require a valid bearer token.
pub trait RoutePolicy: Send + Sync + 'static {
    /// Returns `true` if requests to `path` must be authenticated.
    fn requires_auth(&self, path: &str) -> bool;
}

/// Why a token failed validation.
#[derive(Debug)]
pub enum AuthFailure {
    /// The identity service rejected the token with this status.
    Rejected(StatusCode),
    /// The identity service accepted the token but its response was
    /// missing or malformed identity headers.
    Invalid(String),
    /// The identity service could not be reached.
    Transport(String),
}

/// Validates a bearer token against an identity authority.
pub trait TokenValidator: Send + Sync + 'static {
    /// Validates the `Authorization` header value.
    fn validate<'a>(
        &'a self,
        authorization: &'a str,
        correlation_id: &'a CorrelationId,
    ) -> BoxFuture<'a, Result<ForwardedIdentity, AuthFailure>>;
}

/// Token validator that POSTs to a remote identity endpoint.
///
/// The original `Authorization` header and the request's correlation ID are
/// forwarded verbatim; the endpoint answers with `userId` and `username`
/// response headers on success.
pub struct HttpTokenValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl HttpTokenValidator {
    /// Creates a validator for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(validate_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        // A redirecting identity endpoint is a non-2xx answer, not a
        // location to chase.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            validate_url: validate_url.into(),
        })
    }
}

impl TokenValidator for HttpTokenValidator {
    fn validate<'a>(
        &'a self,
        authorization: &'a str,
        correlation_id: &'a CorrelationId,
    ) -> BoxFuture<'a, Result<ForwardedIdentity, AuthFailure>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.validate_url)
                .header("authorization", authorization)
                .header(CORRELATION_HEADER, correlation_id.as_str())
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        AuthFailure::Transport(format!("identity service timed out: {e}"))
                    } else {
                        AuthFailure::Transport(format!("identity service unreachable: {e}"))
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let propagated = StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::UNAUTHORIZED);
                return Err(AuthFailure::Rejected(propagated));
            }

            let header_value = |name: &str| {
                response
                    .headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(ToString::to_string)
            };

            let user_id_raw = header_value(USER_ID_HEADER).ok_or_else(|| {
                AuthFailure::Invalid(format!("missing {USER_ID_HEADER} header"))
            })?;
            // The user ID is numeric by contract with upstream services.
            let user_id: i64 = user_id_raw.parse().map_err(|_| {
                AuthFailure::Invalid(format!(
                    "non-numeric {USER_ID_HEADER} header: {user_id_raw:?}"
                ))
            })?;
            let username = header_value(USERNAME_HEADER).ok_or_else(|| {
                AuthFailure::Invalid(format!("missing {USERNAME_HEADER} header"))
            })?;

            Ok(ForwardedIdentity::new(user_id, username))
        })
    }
}

/// Pipeline stage that authenticates requests to protected routes.
pub struct AuthenticationMiddleware {
    validator: Arc<dyn TokenValidator>,
    routes: Arc<dyn RoutePolicy>,
}

impl AuthenticationMiddleware {
    /// Creates the authentication stage.
    #[must_use]
    pub fn new(validator: Arc<dyn TokenValidator>, routes: Arc<dyn RoutePolicy>) -> Self {
        Self { validator, routes }
    }
}

impl Middleware for AuthenticationMiddleware {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // Inbound identity headers are never trusted, protected route
            // or not.
            request.headers_mut().remove(USER_ID_HEADER);
            request.headers_mut().remove(USERNAME_HEADER);

            let path = request.uri().path().to_string();
            if !self.routes.requires_auth(&path) {
                return next.run(ctx, request).await;
            }

            let authorization = request
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);

            let Some(authorization) = authorization else {
                debug!(path = %path, "missing authorization header");
                return Response::empty(StatusCode::UNAUTHORIZED);
            };

            if !authorization.starts_with("Bearer ") {
                debug!(path = %path, "authorization header is not a bearer token");
                return Response::empty(StatusCode::UNAUTHORIZED);
            }

            let correlation_id = ctx.correlation_id().clone();
            match self.validator.validate(&authorization, &correlation_id).await {
                Ok(identity) => {
                    request
                        .headers_mut()
                        .insert(USER_ID_HEADER, HeaderValue::from(identity.user_id()));
                    if let Ok(value) = HeaderValue::from_str(identity.username()) {
                        request.headers_mut().insert(USERNAME_HEADER, value);
                    }
                    ctx.set_identity(identity);
                    next.run(ctx, request).await
                }
                Err(AuthFailure::Rejected(status)) => {
                    debug!(path = %path, status = %status, "identity service rejected token");
                    Response::empty(status)
                }
                Err(AuthFailure::Invalid(reason)) => {
                    warn!(path = %path, reason = %reason, "identity service response unusable");
                    let err = GatewayError::bad_gateway(reason);
                    let body = ErrorBody::new(err.status_code(), err.to_string(), &path);
                    Response::json_error(&body)
                }
                Err(AuthFailure::Transport(reason)) => {
                    warn!(path = %path, reason = %reason, "identity service unreachable");
                    let err = GatewayError::bad_gateway(reason);
                    let body = ErrorBody::new(err.status_code(), err.to_string(), &path);
                    Response::json_error(&body)
                }
            }
        })
    }
}
