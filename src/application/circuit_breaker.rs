//! Per-guard circuit breakers.
//!
//! A chronically failing or slow guard is isolated by its own breaker so the
//! rest of the pipeline keeps running. A "failure" here is strictly an
//! execution failure (guard error, panic or timeout); a detected-threat
//! verdict is a successful invocation.

use crate::application::ports::Clock;
use crate::error::ConfigError;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, guard is invoked
    Closed,
    /// Guard is bypassed until the recovery timeout elapses
    Open,
    /// A limited number of trial invocations probe for recovery
    HalfOpen,
}

/// Configuration shared by all per-guard breakers.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive execution failures before the circuit opens
    pub failure_threshold: u32,
    /// How long an open circuit rejects before trialing recovery
    pub recovery_timeout: Duration,
    /// Trial invocations allowed in half-open state
    pub half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            half_open_requests: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.half_open_requests == 0 {
            return Err(ConfigError::ZeroHalfOpenRequests);
        }
        if self.recovery_timeout.is_zero() {
            return Err(ConfigError::ZeroWindow("circuit breaker recovery_timeout"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_remaining: u32,
    half_open_successes: u32,
}

/// Failure-isolation state machine for a single guard.
///
/// Transitions touch several fields together, so one coarse mutex guards
/// them; it is held only for the transition itself, never across a guard
/// invocation.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_remaining: 0,
                half_open_successes: 0,
            }),
            config,
            clock,
        }
    }

    /// Ask permission to invoke the guard.
    ///
    /// Returns `false` when the invocation must be rejected (circuit open,
    /// or half-open trial slots exhausted). An open circuit whose recovery
    /// timeout has elapsed transitions to half-open here and consumes the
    /// first trial slot.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| self.clock.now().saturating_duration_since(at))
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_remaining = self.config.half_open_requests - 1;
                    inner.half_open_successes = 0;
                    debug!("circuit entering half-open trial");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_remaining > 0 {
                    inner.half_open_remaining -= 1;
                    true
                } else {
                    // All trial slots consumed; wait for their outcomes.
                    false
                }
            }
        }
    }

    /// Record a successful guard invocation.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_requests {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                    debug!("circuit closed after successful trial");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a guard execution failure (error, panic or timeout).
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(self.clock.now());
                    warn!(
                        failures = inner.consecutive_failures,
                        "circuit opened after consecutive guard failures"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // Recovery trial failed; back to open with a fresh timeout.
                inner.state = CircuitState::Open;
                inner.opened_at = Some(self.clock.now());
                warn!("circuit re-opened after failed recovery trial");
            }
            CircuitState::Open => {}
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Force the breaker back to closed.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.half_open_remaining = 0;
        inner.half_open_successes = 0;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Map of per-guard breakers, created lazily on first use.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>, ahash::RandomState>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl BreakerRegistry {
    /// Create an empty registry.
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            breakers: DashMap::default(),
            config,
            clock,
        }
    }

    /// The breaker for a guard, created closed if absent.
    pub fn breaker_for(&self, guard: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(guard) {
            return existing.clone();
        }
        self.breakers
            .entry(guard.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(self.config.clone(), self.clock.clone()))
            })
            .clone()
    }

    /// State of a guard's breaker; guards that never failed report closed.
    pub fn state(&self, guard: &str) -> CircuitState {
        self.breakers
            .get(guard)
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Reset every breaker to closed.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}
