//! Structured 404 diagnostics.
//!
//! Unmatched paths get a JSON body that includes the method and query so
//! that client teams can diagnose routing mistakes without gateway logs.

use http::{Method, StatusCode, Uri};
use portico_middleware::{Response, ResponseExt};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct NotFoundBody {
    timestamp: String,
    status: u16,
    error: String,
    message: String,
    path: String,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(rename = "requestId")]
    request_id: String,
}

/// Builds the 404 response for a request that matched no route.
#[must_use]
pub fn not_found(method: &Method, uri: &Uri) -> Response {
    let path = uri.path().to_string();
    let body = NotFoundBody {
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        status: StatusCode::NOT_FOUND.as_u16(),
        error: "Not Found".to_string(),
        message: format!("No route matched path '{path}'"),
        path,
        method: method.to_string(),
        query: uri.query().map(ToString::to_string),
        request_id: Uuid::new_v4().to_string(),
    };

    match serde_json::to_vec(&body) {
        Ok(bytes) => http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(http_body_util::Full::new(bytes::Bytes::from(bytes)))
            .unwrap_or_else(|_| Response::empty(StatusCode::NOT_FOUND)),
        Err(_) => Response::empty(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_not_found_includes_method_and_path() {
        let uri: Uri = "/missing/thing".parse().unwrap();
        let response = not_found(&Method::POST, &uri);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], 404);
        assert_eq!(parsed["error"], "Not Found");
        assert_eq!(parsed["path"], "/missing/thing");
        assert_eq!(parsed["method"], "POST");
        assert!(parsed["message"].as_str().unwrap().contains("/missing/thing"));
        assert!(parsed["requestId"].is_string());
    }

    #[tokio::test]
    async fn test_not_found_includes_query_when_present() {
        let uri: Uri = "/missing?id=7".parse().unwrap();
        let response = not_found(&Method::GET, &uri);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["query"], "id=7");
    }

    #[tokio::test]
    async fn test_not_found_omits_query_when_absent() {
        let uri: Uri = "/missing".parse().unwrap();
        let response = not_found(&Method::GET, &uri);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("query").is_none());
    }

    #[tokio::test]
    async fn test_each_not_found_gets_a_fresh_request_id() {
        let uri: Uri = "/missing".parse().unwrap();

        let mut ids = Vec::new();
        for _ in 0..2 {
            let response = not_found(&Method::GET, &uri);
            let body = response.into_body().collect().await.unwrap().to_bytes();
            let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
            ids.push(parsed["requestId"].as_str().unwrap().to_string());
        }

        assert_ne!(ids[0], ids[1]);
    }
}
