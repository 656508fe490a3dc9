//! Gateway configuration schema.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// HTTP server settings.
    pub server: ServerSection,
    /// Identity service settings.
    pub auth: AuthSection,
    /// Rate limiting settings.
    pub rate_limit: RateLimitSection,
    /// Circuit breaker settings.
    pub breaker: BreakerSection,
    /// Logging settings.
    pub telemetry: TelemetrySection,
    /// Route declarations, matched in order.
    pub routes: Vec<RouteSection>,
    /// Route-id to display-name pairs for fallback messages.
    pub fallbacks: HashMap<String, String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerSection {
    /// Address to bind, e.g. `0.0.0.0:8080`.
    pub listen_addr: String,
    /// Whole-request deadline in seconds.
    pub request_timeout_secs: u64,
    /// Graceful shutdown drain window in seconds.
    pub shutdown_timeout_secs: u64,
    /// Per-upstream call deadline in seconds.
    pub upstream_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            upstream_timeout_secs: 10,
        }
    }
}

/// Identity service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuthSection {
    /// Token validation endpoint.
    pub validate_url: String,
    /// Validation call deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            validate_url: "http://localhost:8090/auth/validate".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Rate limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RateLimitSection {
    /// Whether the rate limit stage is installed at all.
    pub enabled: bool,
    /// Token bucket burst capacity.
    pub capacity: u32,
    /// Tokens restored per second.
    pub refill_per_sec: f64,
    /// Admit requests when the store is unreachable.
    pub fail_open: bool,
    /// Redis connection URL; in-memory buckets are used when unset.
    pub redis_url: Option<String>,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 20,
            refill_per_sec: 10.0,
            fail_open: true,
            redis_url: None,
        }
    }
}

/// Circuit breaker settings, shared by all routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BreakerSection {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// Seconds before an open breaker allows a probe.
    pub reset_timeout_secs: u64,
}

impl Default for BreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 30,
        }
    }
}

/// Telemetry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TelemetrySection {
    /// Logging settings.
    pub logging: LoggingSection,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingSection {
    /// Log level filter, e.g. `info` or `portico=debug,info`.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_format: bool,
    /// Log span open and close events.
    pub span_events: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            span_events: false,
        }
    }
}

/// A single route declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSection {
    /// Stable route identifier.
    pub id: String,
    /// Path prefix, must start with `/`.
    pub prefix: String,
    /// Upstream base URL.
    pub target: String,
    /// Whether requests must carry a valid bearer token.
    #[serde(default)]
    pub requires_auth: bool,
    /// Display name for the fallback message.
    #[serde(default)]
    pub fallback: Option<String>,
}

impl GatewayConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "server.listen_addr '{}' is not a valid socket address",
                    self.server.listen_addr
                ))
            })?;

        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.capacity must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.refill_per_sec <= 0.0 {
            return Err(ConfigError::Invalid(
                "rate_limit.refill_per_sec must be positive".to_string(),
            ));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for route in &self.routes {
            if !route.prefix.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "route '{}': prefix '{}' must start with '/'",
                    route.id, route.prefix
                )));
            }
            if !route.target.starts_with("http://") && !route.target.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "route '{}': target '{}' must be an http(s) URL",
                    route.id, route.target
                )));
            }
            if !seen_ids.insert(route.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate route id '{}'",
                    route.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GatewayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.rate_limit.capacity, 20);
        assert!(config.rate_limit.fail_open);
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            [server]
            listen_addr = "127.0.0.1:9090"
            request_timeout_secs = 15

            [auth]
            validate_url = "http://identity:8090/auth/validate"

            [rate_limit]
            capacity = 50
            refill_per_sec = 25.0
            redis_url = "redis://cache:6379"

            [[routes]]
            id = "order"
            prefix = "/order"
            target = "http://order:8081"
            requires_auth = true
            fallback = "Order Service"

            [[routes]]
            id = "catalog"
            prefix = "/catalog"
            target = "http://catalog:8082"

            [fallbacks]
            order = "Order Service"
        "#;

        let config = GatewayConfig::from_toml(raw).unwrap();
        config.validate().unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.server.request_timeout_secs, 15);
        assert_eq!(config.rate_limit.capacity, 50);
        assert_eq!(
            config.rate_limit.redis_url.as_deref(),
            Some("redis://cache:6379")
        );
        assert_eq!(config.routes.len(), 2);
        assert!(config.routes[0].requires_auth);
        assert!(!config.routes[1].requires_auth);
        assert_eq!(config.fallbacks.get("order").unwrap(), "Order Service");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let raw = r#"
            [server]
            listen_adress = "oops"
        "#;
        assert!(GatewayConfig::from_toml(raw).is_err());
    }

    #[test]
    fn test_invalid_listen_addr() {
        let mut config = GatewayConfig::default();
        config.server.listen_addr = "not-an-addr".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("listen_addr")
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = GatewayConfig::default();
        config.rate_limit.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_route_prefix_must_be_absolute() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteSection {
            id: "bad".to_string(),
            prefix: "order".to_string(),
            target: "http://order:8081".to_string(),
            requires_auth: false,
            fallback: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_route_ids_rejected() {
        let mut config = GatewayConfig::default();
        for _ in 0..2 {
            config.routes.push(RouteSection {
                id: "order".to_string(),
                prefix: "/order".to_string(),
                target: "http://order:8081".to_string(),
                requires_auth: false,
                fallback: None,
            });
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_non_http_target_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteSection {
            id: "bad".to_string(),
            prefix: "/order".to_string(),
            target: "order:8081".to_string(),
            requires_auth: false,
            fallback: None,
        });
        assert!(config.validate().is_err());
    }
}
