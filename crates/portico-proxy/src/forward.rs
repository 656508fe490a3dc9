//! Upstream request forwarding.
//!
//! Builds the upstream URL from the route target and the original path and
//! query, relays method, headers, and body, and converts the upstream
//! response back into the gateway's response type. Hop-by-hop headers are
//! dropped in both directions; identity headers injected by the pipeline
//! pass through untouched.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use portico_core::CORRELATION_HEADER;
use portico_middleware::{GatewayContext, Request, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::table::Route;

/// Forwarding failures, all of which count as upstream unavailability.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The upstream did not answer inside the timeout.
    #[error("upstream timed out")]
    Timeout,

    /// The upstream could not be reached.
    #[error("upstream connection failed: {0}")]
    Connect(String),

    /// The upstream answered but the response could not be relayed.
    #[error("upstream response unusable: {0}")]
    Response(String),
}

/// Headers that terminate at the gateway and are never relayed.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Relays requests to upstream services.
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    /// Creates a forwarder with the given upstream timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(upstream_timeout: Duration) -> Result<Self, reqwest::Error> {
        // Redirects are relayed to the client, never followed.
        let client = reqwest::Client::builder()
            .timeout(upstream_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Forwards `request` to the route's target.
    ///
    /// # Errors
    ///
    /// Returns a [`ForwardError`] when the upstream cannot be reached,
    /// times out, or its response cannot be relayed.
    pub async fn forward(
        &self,
        ctx: &GatewayContext,
        route: &Route,
        request: Request,
    ) -> Result<Response, ForwardError> {
        let url = upstream_url(&route.target, request.uri());
        debug!(route_id = %route.id, upstream = %url, "forwarding request");

        let (parts, body) = request.into_parts();

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| ForwardError::Response(e.to_string()))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in relay_headers(&parts.headers) {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        builder = builder.header(CORRELATION_HEADER, ctx.correlation_id().as_str());

        let upstream = builder.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ForwardError::Timeout
            } else {
                ForwardError::Connect(e.to_string())
            }
        })?;

        let status = StatusCode::from_u16(upstream.status().as_u16())
            .map_err(|e| ForwardError::Response(e.to_string()))?;
        let headers = upstream.headers().clone();
        let body = upstream
            .bytes()
            .await
            .map_err(|e| ForwardError::Response(e.to_string()))?;

        let mut response = http::Response::builder()
            .status(status)
            .body(Full::new(body))
            .map_err(|e| ForwardError::Response(e.to_string()))?;

        for (name, value) in &headers {
            if is_hop_by_hop(name.as_str()) {
                continue;
            }
            let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) else {
                continue;
            };
            let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) else {
                continue;
            };
            response.headers_mut().append(name, value);
        }

        Ok(response)
    }
}

/// Builds the upstream URL from the route target plus the request path and
/// query.
fn upstream_url(target: &str, uri: &http::Uri) -> String {
    let base = target.trim_end_matches('/');
    match uri.query() {
        Some(query) => format!("{base}{}?{query}", uri.path()),
        None => format!("{base}{}", uri.path()),
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Yields the request headers that should be relayed upstream.
///
/// Hop-by-hop headers and `Host` are dropped; `Host` is derived from the
/// upstream URL instead.
fn relay_headers(headers: &HeaderMap) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()) && *name != http::header::HOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_url_joins_path() {
        let uri: http::Uri = "/order/42".parse().unwrap();
        assert_eq!(
            upstream_url("http://order:8081", &uri),
            "http://order:8081/order/42"
        );
    }

    #[test]
    fn test_upstream_url_preserves_query() {
        let uri: http::Uri = "/order?status=open&page=2".parse().unwrap();
        assert_eq!(
            upstream_url("http://order:8081", &uri),
            "http://order:8081/order?status=open&page=2"
        );
    }

    #[test]
    fn test_upstream_url_trims_trailing_slash() {
        let uri: http::Uri = "/order/42".parse().unwrap();
        assert_eq!(
            upstream_url("http://order:8081/", &uri),
            "http://order:8081/order/42"
        );
    }

    #[test]
    fn test_hop_by_hop_headers_filtered() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "keep-alive".parse().unwrap());
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("host", "gateway.local".parse().unwrap());
        headers.insert("accept", "application/json".parse().unwrap());
        headers.insert("userId", "42".parse().unwrap());

        let kept: Vec<&str> = relay_headers(&headers)
            .map(|(name, _)| name.as_str())
            .collect();

        assert!(kept.contains(&"accept"));
        assert!(kept.contains(&"userid"));
        assert!(!kept.contains(&"connection"));
        assert!(!kept.contains(&"transfer-encoding"));
        assert!(!kept.contains(&"host"));
    }

    #[test]
    fn test_hop_by_hop_check_is_case_insensitive() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("TRANSFER-ENCODING"));
        assert!(!is_hop_by_hop("content-type"));
    }
}
