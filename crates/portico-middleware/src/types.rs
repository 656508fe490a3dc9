//! Common types used throughout the request pipeline.
//!
//! This module defines the HTTP request and response types used by
//! middleware and the dispatcher.

use bytes::Bytes;
use http_body_util::Full;
use portico_core::ErrorBody;

/// The HTTP request type used in the pipeline.
///
/// The body is fully collected before the pipeline runs so the dispatcher
/// can hand it to the upstream client in one piece.
pub type Request = http::Request<Bytes>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building gateway responses.
pub trait ResponseExt {
    /// Creates a response with the given status and an empty body.
    ///
    /// Used for authentication rejections and rate-limit denials, which
    /// intentionally carry no body.
    fn empty(status: http::StatusCode) -> Response;

    /// Creates a JSON response carrying the standard error envelope.
    fn json_error(body: &ErrorBody) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: http::StatusCode) -> Response {
        http::Response::builder()
            .status(status)
            .body(Full::new(Bytes::new()))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }

    fn json_error(body: &ErrorBody) -> Response {
        let status =
            http::StatusCode::from_u16(body.status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        let payload = serde_json::to_string(body)
            .unwrap_or_else(|_| format!(r#"{{"status":{}}}"#, body.status));

        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .unwrap_or_else(|_| http::Response::new(Full::new(Bytes::new())))
    }
}
