//! Error types for Portico.
//!
//! This module provides the [`GatewayError`] type, the standard error type
//! used throughout the gateway, and [`ErrorBody`], the JSON envelope that
//! diagnostic error responses serialize to.
//!
//! Authentication rejections and rate-limit denials are deliberately sent
//! with empty bodies; the envelope is reserved for routing diagnostics,
//! upstream fallbacks, and internal failures.

use chrono::{SecondsFormat, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Categories of gateway errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Authentication errors (missing/invalid credentials).
    Authentication,
    /// Rate limiting.
    RateLimited,
    /// No route matched the request path.
    RouteNotFound,
    /// Upstream service unavailable (connect failure, open breaker).
    UpstreamUnavailable,
    /// Upstream or identity service returned something unusable.
    BadGateway,
    /// Request or upstream call timed out.
    Timeout,
    /// Internal gateway errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Portico.
///
/// `GatewayError` provides structured errors with:
/// - Error categorization
/// - HTTP status code mapping
/// - Error chaining support
///
/// # Example
///
/// ```
/// use portico_core::{ErrorCategory, GatewayError};
///
/// let error = GatewayError::authentication("Missing bearer token");
/// assert_eq!(error.category(), ErrorCategory::Authentication);
/// ```
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Human-readable error message.
        message: String,
        /// Seconds until the client may retry.
        retry_after_seconds: Option<u64>,
    },

    /// No route matched the request path.
    #[error("No route matched path '{path}'")]
    RouteNotFound {
        /// The unmatched request path.
        path: String,
    },

    /// Upstream service unavailable.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Human-readable error message.
        message: String,
        /// The logical name of the unavailable service.
        service: Option<String>,
    },

    /// Upstream or identity service returned an unusable response.
    #[error("Bad gateway: {message}")]
    BadGateway {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Request or upstream call timed out.
    #[error("Timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Internal gateway error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl GatewayError {
    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_seconds,
        }
    }

    /// Creates a route-not-found error for a path.
    #[must_use]
    pub fn route_not_found(path: impl Into<String>) -> Self {
        Self::RouteNotFound { path: path.into() }
    }

    /// Creates an upstream-unavailable error.
    #[must_use]
    pub fn upstream_unavailable(
        message: impl Into<String>,
        service: Option<impl Into<String>>,
    ) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            service: service.map(Into::into),
        }
    }

    /// Creates a bad gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a bad gateway error with a source error.
    pub fn bad_gateway_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::BadGateway {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::RouteNotFound { .. } => ErrorCategory::RouteNotFound,
            Self::UpstreamUnavailable { .. } => ErrorCategory::UpstreamUnavailable,
            Self::BadGateway { .. } => ErrorCategory::BadGateway,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Converts this error to the client-facing JSON envelope.
    #[must_use]
    pub fn to_body(&self, path: &str) -> ErrorBody {
        ErrorBody::new(self.status_code(), self.to_string(), path)
    }
}

/// The JSON error envelope returned to clients on diagnostic responses.
///
/// Field names follow the wire format consumed by existing clients, so the
/// `requestId` field keeps its camel-case spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// RFC 3339 timestamp of when the error response was produced.
    pub timestamp: String,
    /// Numeric HTTP status.
    pub status: u16,
    /// Canonical reason phrase for the status.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// The request path that produced the error.
    pub path: String,
    /// Fresh identifier for this error response, for support lookups.
    #[serde(rename = "requestId")]
    pub request_id: String,
}

impl ErrorBody {
    /// Creates an envelope for a status and message.
    ///
    /// Each envelope gets its own random request ID rather than reusing the
    /// correlation ID; the two are logged together so either can be used to
    /// find the other.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: path.into(),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}
