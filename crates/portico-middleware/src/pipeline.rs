//! Fixed-order request pipeline.
//!
//! This module implements the pipeline that all gateway requests flow
//! through before dispatch. The stage order is fixed:
//!
//! 1. **Correlation** - Propagate or mint the correlation ID
//! 2. **Rate Limit** - IP-keyed token bucket against the shared store
//! 3. **Authentication** - Delegate bearer validation to the identity service
//!
//! Stage 2 runs before stage 3 on purpose: a client hammering the gateway
//! is throttled before it can generate load on the identity service.

use crate::context::GatewayContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased middleware that can be stored in the pipeline.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The fixed-order request pipeline.
///
/// The pipeline cannot be modified after construction; stages execute in
/// the order they were added.
///
/// # Example
///
/// ```ignore
/// use portico_middleware::pipeline::Pipeline;
///
/// let pipeline = Pipeline::builder()
///     .add_stage(correlation)
///     .add_stage(rate_limit)
///     .add_stage(authentication)
///     .build();
///
/// let response = pipeline.process(ctx, request, dispatch).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through the entire pipeline.
    ///
    /// The request flows through all stages in order and then to the
    /// terminal handler, normally the route dispatcher. Any stage may
    /// short-circuit with its own response.
    pub async fn process<H>(&self, mut ctx: GatewayContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(&mut ctx, request).await
    }

    /// Builds the middleware chain from back to front.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);

        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next
    }

    /// Returns the names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Adds a stage to the end of the pipeline.
    ///
    /// Stages execute in insertion order; see [`Stage`] for the canonical
    /// gateway ordering.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// Stage marker for the canonical gateway pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: Correlation ID propagation
    Correlation = 1,
    /// Stage 2: Rate limiting
    RateLimit = 2,
    /// Stage 3: Authentication
    Authentication = 3,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::RateLimit => "rate_limit",
            Self::Authentication => "authentication",
        }
    }

    /// Returns all stages in execution order.
    #[must_use]
    pub const fn all() -> [Stage; 3] {
        [Self::Correlation, Self::RateLimit, Self::Authentication]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A test middleware that records its invocation order.
    struct OrderTrackingMiddleware {
        name: &'static str,
        counter: Arc<AtomicUsize>,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTrackingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut GatewayContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            let counter = self.counter.clone();
            let order = self.order.clone();
            let name = self.name;

            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                order.lock().unwrap().push(name);
                next.run(ctx, request).await
            })
        }
    }

    fn ok_handler(
        _ctx: &mut GatewayContext,
        _req: Request,
    ) -> BoxFuture<'static, Response> {
        Box::pin(async {
            HttpResponse::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from("OK")))
                .unwrap()
        })
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let pipeline = Pipeline::builder()
            .add_stage(OrderTrackingMiddleware {
                name: "first",
                counter: counter.clone(),
                order: order.clone(),
            })
            .add_stage(OrderTrackingMiddleware {
                name: "second",
                counter: counter.clone(),
                order: order.clone(),
            })
            .add_stage(OrderTrackingMiddleware {
                name: "third",
                counter: counter.clone(),
                order: order.clone(),
            })
            .build();

        let ctx = GatewayContext::new();
        let request: Request = HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline.process(ctx, request, ok_handler).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let executed = order.lock().unwrap();
        assert_eq!(*executed, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_reaches_handler() {
        let pipeline = Pipeline::builder().build();

        let ctx = GatewayContext::new();
        let request: Request = HttpRequest::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline.process(ctx, request, ok_handler).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Correlation < Stage::RateLimit);
        assert!(Stage::RateLimit < Stage::Authentication);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Correlation.name(), "correlation");
        assert_eq!(Stage::RateLimit.name(), "rate_limit");
        assert_eq!(Stage::Authentication.name(), "authentication");
    }

    #[test]
    fn test_stage_all() {
        let stages = Stage::all();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0], Stage::Correlation);
        assert_eq!(stages[1], Stage::RateLimit);
        assert_eq!(stages[2], Stage::Authentication);
    }

    #[test]
    fn test_stage_count() {
        let pipeline = Pipeline::builder().build();
        assert_eq!(pipeline.stage_count(), 0);
    }
}
