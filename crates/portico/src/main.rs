//! Portico gateway binary.
//!
//! Loads configuration (`PORTICO_CONFIG` or `portico.toml`), wires the
//! pipeline and dispatcher, and runs the server until SIGTERM/SIGINT.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use portico_config::GatewayConfig;
use portico_middleware::{
    AuthenticationMiddleware, CorrelationMiddleware, HttpTokenValidator, MemoryStore, Pipeline,
    Quota, RateLimitMiddleware, RateLimitStore, RedisStore,
};
use portico_proxy::{FallbackRegistry, Forwarder, Route, RouteDispatcher, RouteTable};
use portico_server::{GatewayServer, ServerConfig};
use portico_telemetry::logging::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("PORTICO_CONFIG").unwrap_or_else(|_| "portico.toml".to_string());
    let config = portico_config::load_or_default(&config_path)
        .with_context(|| format!("loading config from {config_path}"))?;
    config.validate().context("validating config")?;

    let log_config = LogConfig {
        enabled: true,
        level: config.telemetry.logging.level.clone(),
        json_format: config.telemetry.logging.json_format,
        span_events: config.telemetry.logging.span_events,
        ..LogConfig::default()
    };
    portico_telemetry::init_logging(&log_config).context("initializing logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        routes = config.routes.len(),
        "starting portico gateway"
    );

    let table = Arc::new(build_route_table(&config));
    let pipeline = Arc::new(build_pipeline(&config, Arc::clone(&table)).await?);

    let forwarder = Forwarder::new(Duration::from_secs(config.server.upstream_timeout_secs))
        .context("building upstream client")?;

    let mut fallbacks = FallbackRegistry::from_names(config.fallbacks.clone());
    for route in &config.routes {
        if let Some(name) = &route.fallback {
            fallbacks.register(route.id.clone(), name.clone());
        }
    }

    let dispatcher = Arc::new(RouteDispatcher::new(
        table,
        forwarder,
        fallbacks,
        config.breaker.failure_threshold,
        Duration::from_secs(config.breaker.reset_timeout_secs),
    ));

    let server_config = ServerConfig::builder()
        .listen_addr(&config.server.listen_addr)
        .request_timeout(Duration::from_secs(config.server.request_timeout_secs))
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .build();

    let server = GatewayServer::new(server_config, pipeline, dispatcher);
    server.run().await.context("running server")?;

    Ok(())
}

fn build_route_table(config: &GatewayConfig) -> RouteTable {
    let routes = config
        .routes
        .iter()
        .map(|section| {
            let mut route = Route::new(&section.id, &section.prefix, &section.target);
            if section.requires_auth {
                route = route.protected();
            }
            if let Some(name) = &section.fallback {
                route = route.with_fallback(name.clone());
            }
            route
        })
        .collect();
    RouteTable::new(routes)
}

async fn build_pipeline(config: &GatewayConfig, table: Arc<RouteTable>) -> anyhow::Result<Pipeline> {
    let mut builder = Pipeline::builder().add_stage(CorrelationMiddleware::new());

    if config.rate_limit.enabled {
        let store: Arc<dyn RateLimitStore> = match &config.rate_limit.redis_url {
            Some(url) => {
                let store = RedisStore::connect(url)
                    .await
                    .with_context(|| format!("connecting to rate limit store at {url}"))?;
                tracing::info!("rate limit buckets shared via redis");
                Arc::new(store)
            }
            None => {
                tracing::info!("rate limit buckets are in-memory, not shared across instances");
                Arc::new(MemoryStore::new())
            }
        };

        builder = builder.add_stage(
            RateLimitMiddleware::builder(store)
                .quota(Quota::new(
                    config.rate_limit.capacity,
                    config.rate_limit.refill_per_sec,
                ))
                .fail_open(config.rate_limit.fail_open)
                .build(),
        );
    }

    let validator = HttpTokenValidator::new(
        &config.auth.validate_url,
        Duration::from_secs(config.auth.timeout_secs),
    )
    .context("building identity client")?;

    builder = builder.add_stage(AuthenticationMiddleware::new(Arc::new(validator), table));

    Ok(builder.build())
}
