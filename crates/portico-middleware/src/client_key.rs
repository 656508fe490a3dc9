//! Proxy-aware client key resolution.
//!
//! Requests arriving through a load balancer or reverse proxy carry the
//! original client address in `X-Forwarded-For`. Keying rate limits on the
//! peer address alone would collapse every client behind the proxy onto one
//! bucket, so the forwarded header wins when present.

use http::HeaderMap;
use std::net::SocketAddr;

/// Forwarded client header consulted before the peer address.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves the client key for a request.
///
/// The first entry of `X-Forwarded-For` is the originating client; later
/// entries are intermediate proxies and are ignored. Falls back to the peer
/// IP, then to [`UNKNOWN_CLIENT`].
#[must_use]
pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(value) = headers.get(FORWARDED_FOR) {
        if let Ok(raw) = value.to_str() {
            let first = raw.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_forwarded_for_single_entry() {
        let headers = headers_with("203.0.113.5");
        assert_eq!(resolve(&headers, None), "203.0.113.5");
    }

    #[test]
    fn test_forwarded_for_first_of_chain() {
        let headers = headers_with("203.0.113.5, 10.0.0.1, 172.16.0.1");
        assert_eq!(resolve(&headers, None), "203.0.113.5");
    }

    #[test]
    fn test_forwarded_for_trims_whitespace() {
        let headers = headers_with("  203.0.113.5  , 10.0.0.1");
        assert_eq!(resolve(&headers, None), "203.0.113.5");
    }

    #[test]
    fn test_empty_forwarded_for_falls_back_to_peer() {
        let headers = headers_with("");
        let peer: SocketAddr = "192.0.2.7:45000".parse().unwrap();
        assert_eq!(resolve(&headers, Some(peer)), "192.0.2.7");
    }

    #[test]
    fn test_peer_address_ignores_port() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.7:45000".parse().unwrap();
        assert_eq!(resolve(&headers, Some(peer)), "192.0.2.7");
    }

    #[test]
    fn test_ipv6_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(resolve(&headers, Some(peer)), "2001:db8::1");
    }

    #[test]
    fn test_unknown_when_nothing_available() {
        let headers = HeaderMap::new();
        assert_eq!(resolve(&headers, None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_forwarded_for_wins_over_peer() {
        let headers = headers_with("203.0.113.5");
        let peer: SocketAddr = "192.0.2.7:45000".parse().unwrap();
        assert_eq!(resolve(&headers, Some(peer)), "203.0.113.5");
    }
}
