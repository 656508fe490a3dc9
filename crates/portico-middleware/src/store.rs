//! Token bucket admission stores.
//!
//! The rate limiter delegates the bucket bookkeeping to a [`RateLimitStore`]
//! so that a fleet of gateway instances can share counters. Two backends are
//! provided: [`RedisStore`] for shared state across instances, with the
//! refill-and-consume step executed atomically as a Lua script, and
//! [`MemoryStore`] for single-instance deployments and tests.

use crate::middleware::BoxFuture;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

/// Token bucket parameters for a single client key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    /// Maximum burst size.
    pub capacity: u32,
    /// Tokens restored per second.
    pub refill_per_sec: f64,
}

impl Quota {
    /// Creates a new quota.
    #[must_use]
    pub const fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed.
    Allowed {
        /// Whole tokens left in the bucket after this request.
        remaining: u32,
    },
    /// The bucket is empty.
    Denied {
        /// Time until at least one token is available.
        retry_after: Duration,
    },
}

/// Errors from the admission store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("rate limit store unavailable: {0}")]
    Unavailable(String),

    /// The store returned a reply we could not interpret.
    #[error("rate limit store protocol error: {0}")]
    Protocol(String),
}

/// Shared admission store for token bucket rate limiting.
pub trait RateLimitStore: Send + Sync + 'static {
    /// Attempts to consume one token from the bucket for `key`.
    ///
    /// Refill and consumption must be atomic with respect to concurrent
    /// callers against the same key.
    fn admit<'a>(
        &'a self,
        key: &'a str,
        quota: Quota,
    ) -> BoxFuture<'a, Result<Admission, StoreError>>;
}

/// Per-key bucket state for the in-memory store.
struct Bucket {
    tokens: f64,
    updated: Instant,
}

/// In-process token bucket store.
///
/// Counters are local to this instance; use [`RedisStore`] when multiple
/// gateway instances must share limits.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn admit<'a>(
        &'a self,
        key: &'a str,
        quota: Quota,
    ) -> BoxFuture<'a, Result<Admission, StoreError>> {
        Box::pin(async move {
            let mut buckets = self.buckets.lock().await;
            let now = Instant::now();

            let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
                tokens: f64::from(quota.capacity),
                updated: now,
            });

            let elapsed = now.duration_since(bucket.updated).as_secs_f64();
            bucket.tokens = (bucket.tokens + elapsed * quota.refill_per_sec)
                .min(f64::from(quota.capacity));
            bucket.updated = now;

            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let remaining = bucket.tokens.floor() as u32;
                Ok(Admission::Allowed { remaining })
            } else {
                let deficit = 1.0 - bucket.tokens;
                let retry_after = if quota.refill_per_sec > 0.0 {
                    Duration::from_secs_f64(deficit / quota.refill_per_sec)
                } else {
                    Duration::from_secs(1)
                };
                Ok(Admission::Denied { retry_after })
            }
        })
    }
}

/// Lua script executed atomically on the Redis side.
///
/// KEYS[1] = bucket hash key
/// ARGV[1] = capacity, ARGV[2] = refill per second, ARGV[3] = now in ms
///
/// Returns `{allowed (0|1), tokens-after as string}`.
const ADMIT_SCRIPT: &str = r"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill = tonumber(ARGV[2])
local now_ms = tonumber(ARGV[3])

local state = redis.call('HMGET', key, 'tokens', 'updated_ms')
local tokens = tonumber(state[1])
local updated_ms = tonumber(state[2])

if tokens == nil then
    tokens = capacity
    updated_ms = now_ms
end

local elapsed = (now_ms - updated_ms) / 1000.0
if elapsed > 0 then
    tokens = math.min(capacity, tokens + elapsed * refill)
end

local allowed = 0
if tokens >= 1 then
    tokens = tokens - 1
    allowed = 1
end

redis.call('HSET', key, 'tokens', tokens, 'updated_ms', now_ms)
redis.call('PEXPIRE', key, math.ceil(capacity / refill) * 2000)

return {allowed, tostring(tokens)}
";

/// Redis-backed admission store shared across gateway instances.
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
    script: redis::Script,
    key_prefix: String,
}

impl RedisStore {
    /// Connects to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            conn,
            script: redis::Script::new(ADMIT_SCRIPT),
            key_prefix: "ratelimit:".to_string(),
        })
    }

    fn bucket_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl RateLimitStore for RedisStore {
    fn admit<'a>(
        &'a self,
        key: &'a str,
        quota: Quota,
    ) -> BoxFuture<'a, Result<Admission, StoreError>> {
        Box::pin(async move {
            let now_ms = u64::try_from(
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| StoreError::Protocol(e.to_string()))?
                    .as_millis(),
            )
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

            let mut conn = self.conn.clone();
            let (allowed, tokens): (i64, String) = self
                .script
                .key(self.bucket_key(key))
                .arg(quota.capacity)
                .arg(quota.refill_per_sec)
                .arg(now_ms)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let tokens: f64 = tokens
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad token count: {tokens}")))?;

            if allowed == 1 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let remaining = tokens.floor().max(0.0) as u32;
                Ok(Admission::Allowed { remaining })
            } else {
                let deficit = (1.0 - tokens).max(0.0);
                let retry_after = if quota.refill_per_sec > 0.0 {
                    Duration::from_secs_f64(deficit / quota.refill_per_sec)
                } else {
                    Duration::from_secs(1)
                };
                Ok(Admission::Denied { retry_after })
            }
        })
    }
}
