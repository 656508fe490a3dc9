//! Correlation ID propagation stage.
//!
//! Reuses the inbound `X-Correlation-Id` header when the client supplied a
//! non-empty value, otherwise mints a fresh ID. The ID is stored in the
//! request context, ensured on the forwarded request, and echoed on every
//! response including error responses produced by later stages.

use crate::context::GatewayContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use http::HeaderValue;
use portico_core::{CorrelationId, CORRELATION_HEADER};
use tracing::debug;

/// Pipeline stage that propagates or mints the correlation ID.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationMiddleware;

impl CorrelationMiddleware {
    /// Creates the correlation stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for CorrelationMiddleware {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let inbound = request
                .headers()
                .get(CORRELATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(CorrelationId::from_header);

            let correlation_id = match inbound {
                Some(id) => id,
                None => {
                    let id = CorrelationId::generate();
                    debug!(correlation_id = %id, "minted correlation id");
                    id
                }
            };

            if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
                request.headers_mut().insert(CORRELATION_HEADER, value);
            }
            ctx.set_correlation_id(correlation_id.clone());

            let mut response = next.run(ctx, request).await;

            if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
                response.headers_mut().insert(CORRELATION_HEADER, value);
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    fn echo_header_handler(
        _ctx: &mut GatewayContext,
        req: Request,
    ) -> BoxFuture<'static, Response> {
        let seen = req
            .headers()
            .get(CORRELATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("missing")
            .to_string();
        Box::pin(async move {
            HttpResponse::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from(seen)))
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_reuses_inbound_correlation_id() {
        let pipeline = Pipeline::builder()
            .add_stage(CorrelationMiddleware::new())
            .build();

        let request: Request = HttpRequest::builder()
            .uri("/orders")
            .header(CORRELATION_HEADER, "req-abc-123")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline
            .process(GatewayContext::new(), request, echo_header_handler)
            .await;

        assert_eq!(
            response.headers().get(CORRELATION_HEADER).unwrap(),
            "req-abc-123"
        );
    }

    #[tokio::test]
    async fn test_mints_id_when_absent() {
        let pipeline = Pipeline::builder()
            .add_stage(CorrelationMiddleware::new())
            .build();

        let request: Request = HttpRequest::builder()
            .uri("/orders")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline
            .process(GatewayContext::new(), request, echo_header_handler)
            .await;

        let id = response
            .headers()
            .get(CORRELATION_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn test_mints_id_when_header_blank() {
        let pipeline = Pipeline::builder()
            .add_stage(CorrelationMiddleware::new())
            .build();

        let request: Request = HttpRequest::builder()
            .uri("/orders")
            .header(CORRELATION_HEADER, "   ")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline
            .process(GatewayContext::new(), request, echo_header_handler)
            .await;

        let id = response
            .headers()
            .get(CORRELATION_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert_ne!(id.trim(), "");
    }

    #[tokio::test]
    async fn test_forwarded_request_carries_id() {
        let pipeline = Pipeline::builder()
            .add_stage(CorrelationMiddleware::new())
            .build();

        let request: Request = HttpRequest::builder()
            .uri("/orders")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline
            .process(GatewayContext::new(), request, echo_header_handler)
            .await;

        use http_body_util::BodyExt;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_ne!(body, Bytes::from("missing"));
    }
}
