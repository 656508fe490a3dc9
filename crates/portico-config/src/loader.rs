//! Configuration loading with environment overrides.
//!
//! `PORTICO_*` environment variables override the file so the same config
//! can be reused across environments:
//!
//! | Variable                       | Overrides                  |
//! |--------------------------------|----------------------------|
//! | `PORTICO_LISTEN_ADDR`          | `server.listen_addr`       |
//! | `PORTICO_LOG_LEVEL`            | `telemetry.logging.level`  |
//! | `PORTICO_REDIS_URL`            | `rate_limit.redis_url`     |
//! | `PORTICO_AUTH_VALIDATE_URL`    | `auth.validate_url`        |
//! | `PORTICO_RATE_LIMIT_CAPACITY`  | `rate_limit.capacity`      |
//! | `PORTICO_RATE_LIMIT_FAIL_OPEN` | `rate_limit.fail_open`     |

use crate::config::GatewayConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::{debug, info};

/// Loads configuration from `path` and applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or an override
/// value is malformed.
pub fn load(path: impl AsRef<Path>) -> ConfigResult<GatewayConfig> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let mut config = GatewayConfig::from_toml(&raw)?;
    apply_env_overrides(&mut config)?;
    info!(path = %path.as_ref().display(), "loaded configuration");
    Ok(config)
}

/// Loads configuration from `path` if it exists, otherwise starts from
/// defaults. Environment overrides apply either way.
///
/// # Errors
///
/// Returns an error if an existing file cannot be parsed or an override
/// value is malformed.
pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<GatewayConfig> {
    let path = path.as_ref();
    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        info!(path = %path.display(), "loaded configuration");
        GatewayConfig::from_toml(&raw)?
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        GatewayConfig::default()
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut GatewayConfig) -> ConfigResult<()> {
    if let Ok(addr) = std::env::var("PORTICO_LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }
    if let Ok(level) = std::env::var("PORTICO_LOG_LEVEL") {
        config.telemetry.logging.level = level;
    }
    if let Ok(url) = std::env::var("PORTICO_REDIS_URL") {
        config.rate_limit.redis_url = Some(url);
    }
    if let Ok(url) = std::env::var("PORTICO_AUTH_VALIDATE_URL") {
        config.auth.validate_url = url;
    }
    if let Ok(capacity) = std::env::var("PORTICO_RATE_LIMIT_CAPACITY") {
        config.rate_limit.capacity = capacity.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "PORTICO_RATE_LIMIT_CAPACITY '{capacity}' is not a number"
            ))
        })?;
    }
    if let Ok(fail_open) = std::env::var("PORTICO_RATE_LIMIT_FAIL_OPEN") {
        config.rate_limit.fail_open = fail_open.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "PORTICO_RATE_LIMIT_FAIL_OPEN '{fail_open}' is not a boolean"
            ))
        })?;
    }
    Ok(())
}
