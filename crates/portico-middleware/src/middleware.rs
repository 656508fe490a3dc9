//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all pipeline stages
//! implement. Middleware processes requests before they are dispatched
//! upstream and responses on the way back out.
//!
//! # Design Philosophy
//!
//! Portico uses a fixed-order pipeline. Stages cannot be reordered or
//! inserted between the core stages; every request through the gateway
//! sees the same sequence.
//!
//! # Example
//!
//! ```ignore
//! use portico_middleware::{Middleware, Next, Request, Response, BoxFuture};
//! use portico_middleware::context::GatewayContext;
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut GatewayContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             tracing::debug!(correlation_id = %ctx.correlation_id(), "request");
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(status = %response.status(), "response");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::GatewayContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// All pipeline stages implement this trait. Middleware receives a mutable
/// context, the incoming request, and a [`Next`] callback to invoke the
/// next stage in the chain.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` exactly once (unless short-circuiting)
/// - Middleware MUST NOT suppress a short-circuit response from an earlier stage
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    ///
    /// Returns the HTTP response, either from downstream or generated here
    /// when the stage short-circuits (rejection, denial).
    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the next middleware in the chain.
///
/// Passed to middleware and consumed (exactly once) to continue processing.
/// If not called, the middleware short-circuits the pipeline and returns
/// its own response.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

/// Internal representation of the remaining chain.
enum NextInner<'a> {
    /// More middleware to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain - invoke the terminal handler
    Handler(
        Box<dyn FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a>,
    ),
}

impl<'a> Next<'a> {
    /// Creates a new `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    ///
    /// This consumes `self` to ensure it can only be called once.
    pub async fn run(self, ctx: &mut GatewayContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A middleware created from an async function.
///
/// Allows defining simple middleware without implementing the trait directly.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(&mut GatewayContext, Request, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move { (self.func)(ctx, request, next).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    struct TaggingMiddleware {
        name: &'static str,
    }

    impl Middleware for TaggingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut GatewayContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                ctx.set_extension(format!("visited:{}", self.name));
                next.run(ctx, request).await
            })
        }
    }

    fn ok_response() -> Response {
        HttpResponse::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("OK")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_middleware_name() {
        let mw = TaggingMiddleware { name: "test" };
        assert_eq!(mw.name(), "test");
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = GatewayContext::new();
        let request: Request = HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap();

        let next = Next::handler(|_ctx, _req| Box::pin(async { ok_response() }));

        let response = next.run(&mut ctx, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain() {
        let mw1 = TaggingMiddleware { name: "first" };
        let mw2 = TaggingMiddleware { name: "second" };

        let mut ctx = GatewayContext::new();
        let request: Request = HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap();

        let handler = Next::handler(|_ctx, _req| Box::pin(async { ok_response() }));
        let next2 = Next::new(&mw2, handler);
        let next1 = Next::new(&mw1, next2);

        let response = next1.run(&mut ctx, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            ctx.get_extension::<String>(),
            Some(&"visited:second".to_string())
        );
    }

    #[tokio::test]
    async fn test_fn_middleware() {
        let mw = FnMiddleware::new("short-circuit", |_ctx: &mut GatewayContext, _req, _next: Next<'_>| {
            async {
                HttpResponse::builder()
                    .status(StatusCode::TOO_MANY_REQUESTS)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            }
        });

        let mut ctx = GatewayContext::new();
        let request: Request = HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap();

        let handler = Next::handler(|_ctx, _req| Box::pin(async { ok_response() }));
        let next = Next::new(&mw, handler);

        let response = next.run(&mut ctx, request).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
