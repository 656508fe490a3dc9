//! Per-route circuit breaker.
//!
//! Tracks consecutive forwarding failures for one upstream. After
//! `failure_threshold` failures the breaker opens and requests go straight
//! to the route's fallback. Once `reset_timeout` has elapsed a single
//! probe request is let through; success closes the breaker, failure
//! reopens it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally.
    Closed,
    /// Requests are short-circuited to the fallback.
    Open,
    /// The reset timeout has elapsed; the next request probes the upstream.
    HalfOpen,
}

/// Consecutive-failure circuit breaker for one upstream.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    failures: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    #[must_use]
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            failures: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> BreakerState {
        let opened_at = self.opened_at.lock();
        match *opened_at {
            None => BreakerState::Closed,
            Some(at) if at.elapsed() >= self.reset_timeout => BreakerState::HalfOpen,
            Some(_) => BreakerState::Open,
        }
    }

    /// Returns `true` if a request may be attempted right now.
    ///
    /// Half-open allows the request through as a probe.
    pub fn allow(&self) -> bool {
        !matches!(self.state(), BreakerState::Open)
    }

    /// Records a successful forward, closing the breaker.
    pub fn record_success(&self) {
        let was_open = self.opened_at.lock().take().is_some();
        self.failures.store(0, Ordering::SeqCst);
        if was_open {
            info!("circuit breaker closed after successful probe");
        }
    }

    /// Records a failed forward, opening the breaker at the threshold.
    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.failure_threshold {
            let mut opened_at = self.opened_at.lock();
            if opened_at.is_none() {
                warn!(failures, "circuit breaker opened");
            }
            *opened_at = Some(Instant::now());
        }
    }

    /// Returns the consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }
}
