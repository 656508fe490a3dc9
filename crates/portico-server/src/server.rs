//! Gateway HTTP server.
//!
//! Built on hyper and tokio. Each connection is served on its own task;
//! each request is collected into memory, run through the pipeline with
//! the route dispatcher as the terminal handler, and bounded by the
//! configured request timeout.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;

use portico_core::ErrorBody;
use portico_middleware::{GatewayContext, Pipeline, Response, ResponseExt};
use portico_proxy::RouteDispatcher;

use crate::config::ServerConfig;
use crate::health::{HealthCheck, ReadinessCheck};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("bind error: {0}")]
    Bind(String),
}

/// The gateway HTTP server.
pub struct GatewayServer {
    config: ServerConfig,
    pipeline: Arc<Pipeline>,
    dispatcher: Arc<RouteDispatcher>,
    health: HealthCheck,
    readiness: ReadinessCheck,
}

impl GatewayServer {
    /// Creates a server over a pipeline and dispatcher.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        pipeline: Arc<Pipeline>,
        dispatcher: Arc<RouteDispatcher>,
    ) -> Self {
        Self {
            config,
            pipeline,
            dispatcher,
            health: HealthCheck::new("portico", env!("CARGO_PKG_VERSION")),
            readiness: ReadinessCheck::new(),
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the readiness check handle.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessCheck {
        &self.readiness
    }

    /// Runs the server until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the server with an external shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::Bind(format!(
                "invalid address '{}': {e}",
                self.config.listen_addr()
            ))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("failed to bind to {addr}: {e}")))?;

        tracing::info!("gateway listening on {}", addr);

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown_clone = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown_clone).await {
                                    tracing::error!("connection error from {}: {}", remote_addr, e);
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!("failed to accept connection: {}", e);
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        // Stop advertising readiness while draining.
        server.readiness.set_ready(false);

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            "waiting up to {:?} for {} connections to close",
            shutdown_timeout,
            tracker.active_connections()
        );

        tokio::select! {
            () = tracker.wait_for_drain() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    "shutdown timeout reached, {} connections still active",
                    tracker.active_connections()
                );
            }
        }

        tracing::info!("gateway stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);

        tokio::select! {
            result = conn => result,
            () = shutdown.recv() => {
                tracing::debug!("connection from {} closed due to shutdown", remote_addr);
                Ok(())
            }
        }
    }

    async fn handle_request(
        self: &Arc<Self>,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Response, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        tracing::debug!("{} {}", method, path);

        // Probe endpoints are answered directly and never enter the
        // pipeline.
        match (method.as_ref(), path.as_str()) {
            ("GET", "/health") => return Ok(self.handle_health()),
            ("GET", "/ready") => return Ok(self.handle_ready()),
            _ => {}
        }

        let request_timeout = self.config.request_timeout();

        let (parts, body) = req.into_parts();
        let body = match tokio::time::timeout(request_timeout, collect_body(body)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::warn!("failed to read request body: {}", e);
                let body = ErrorBody::new(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read request body: {e}"),
                    &path,
                );
                return Ok(Response::json_error(&body));
            }
            Err(_) => {
                tracing::warn!("request body collection timed out");
                return Ok(Response::empty(StatusCode::REQUEST_TIMEOUT));
            }
        };

        let request = Request::from_parts(parts, body);
        let ctx = GatewayContext::for_peer(remote_addr);

        let dispatcher = Arc::clone(&self.dispatcher);
        let handler = move |ctx: &mut GatewayContext, request| {
            let snapshot = ctx.clone();
            let fut: portico_middleware::BoxFuture<'static, Response> =
                Box::pin(async move { dispatcher.dispatch(&snapshot, request).await });
            fut
        };

        let outcome =
            tokio::time::timeout(request_timeout, self.pipeline.process(ctx, request, handler))
                .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(_) => {
                tracing::warn!("request timed out for {} {}", method, path);
                let body = ErrorBody::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    "The request did not complete in time",
                    &path,
                );
                Ok(Response::json_error(&body))
            }
        }
    }

    fn handle_health(&self) -> Response {
        let status = self.health.status();
        json_response(StatusCode::OK, &status)
    }

    fn handle_ready(&self) -> Response {
        let status = self.readiness.status();
        let code = if status.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        json_response(code, &status)
    }
}

async fn collect_body(body: Incoming) -> Result<Bytes, hyper::Error> {
    let collected = body.collect().await?;
    Ok(collected.to_bytes())
}

fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .unwrap_or_else(|_| Response::empty(status)),
        Err(_) => Response::empty(status),
    }
}
