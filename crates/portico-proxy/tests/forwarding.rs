//! Forwarding tests against live local backends.
//!
//! Each backend is a raw TCP listener serving one canned HTTP/1.1
//! response, so the tests can assert both what the gateway relays to the
//! client and what actually arrived on the upstream wire.

use bytes::Bytes;
use http::{Request as HttpRequest, StatusCode};
use http_body_util::BodyExt;
use portico_core::{CorrelationId, ForwardedIdentity, USERNAME_HEADER, USER_ID_HEADER};
use portico_middleware::GatewayContext;
use portico_proxy::{FallbackRegistry, Forwarder, Route, RouteDispatcher, RouteTable};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serves exactly one connection with `response` and hands back the raw
/// request bytes that were received.
async fn one_shot_backend(response: String) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0_u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            if n == 0 || raw.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
    });

    (addr, rx)
}

fn dispatcher_to(addr: SocketAddr) -> RouteDispatcher {
    let table = Arc::new(RouteTable::new(vec![Route::new(
        "order",
        "/order",
        format!("http://{addr}/"),
    )]));
    let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
    RouteDispatcher::new(
        table,
        forwarder,
        FallbackRegistry::new(),
        2,
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn test_backend_status_body_and_wire_headers_pass_through() {
    let (addr, received) = one_shot_backend(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\npong"
            .to_string(),
    )
    .await;
    let dispatcher = dispatcher_to(addr);

    let mut ctx = GatewayContext::new();
    ctx.set_correlation_id(CorrelationId::from_header("corr-123").unwrap());
    ctx.set_identity(ForwardedIdentity::new(7, "grace"));

    let request = HttpRequest::builder()
        .uri("/order/42?status=open")
        .header(USER_ID_HEADER, "7")
        .header(USERNAME_HEADER, "grace")
        .body(Bytes::new())
        .unwrap();

    let response = dispatcher.dispatch(&ctx, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"pong");

    let wire = received.await.unwrap().to_lowercase();
    assert!(wire.starts_with("get /order/42?status=open"));
    assert!(wire.contains("userid: 7"));
    assert!(wire.contains("username: grace"));
    assert!(wire.contains("x-correlation-id: corr-123"));
}

#[tokio::test]
async fn test_backend_redirect_is_relayed_not_followed() {
    // Second listener the redirect points at. If the gateway chased the
    // Location it would come back with this 200 instead of the 302.
    let (other_addr, _other) = one_shot_backend(
        "HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nfollow".to_string(),
    )
    .await;
    let location = format!("http://{other_addr}/elsewhere");

    let (addr, _received) = one_shot_backend(format!(
        "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    ))
    .await;

    let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
    let route = Route::new("order", "/order", format!("http://{addr}/"));
    let request: http::Request<Bytes> = HttpRequest::builder()
        .uri("/order/1")
        .body(Bytes::new())
        .unwrap();

    let response = forwarder
        .forward(&GatewayContext::new(), &route, request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").unwrap().to_str().unwrap(),
        location
    );
}

/// Serves one connection per scripted response, in order.
async fn scripted_backend(responses: Vec<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });

    addr
}

#[tokio::test]
async fn test_unrelayable_response_falls_back_without_tripping_breaker() {
    // Truncated responses (Content-Length larger than the bytes sent)
    // are unrelayable but prove the upstream is alive. The failure
    // threshold is 2: if they counted toward the breaker, the third
    // request would short-circuit to the fallback instead of reaching
    // the now-healthy backend.
    let truncated =
        "HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\nhi".to_string();
    let healthy =
        "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\npong".to_string();
    let addr = scripted_backend(vec![truncated.clone(), truncated, healthy]).await;
    let dispatcher = dispatcher_to(addr);

    let get = || {
        HttpRequest::builder()
            .uri("/order/1")
            .body(Bytes::new())
            .unwrap()
    };

    for _ in 0..2 {
        let response = dispatcher.dispatch(&GatewayContext::new(), get()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    let response = dispatcher.dispatch(&GatewayContext::new(), get()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"pong");
}
