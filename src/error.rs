//! Error types for configuration and direct guard invocation.
//!
//! Guard-level failures are data, not errors: they surface as
//! [`GuardOutcome`](crate::application::executor::GuardOutcome) variants and
//! skip reasons, never as `Err` from an inspection. Only configuration errors
//! are fatal, and only at construction time.

use thiserror::Error;

/// Invalid configuration detected at construction time.
///
/// Every variant is fatal at boot; an engine that builds successfully never
/// raises configuration errors at request time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Dedup cache capacity must be at least 1
    #[error("dedup cache capacity must be greater than 0")]
    ZeroDedupCapacity,

    /// Sampling rate must lie in [0.0, 1.0]
    #[error("sampling rate {0} is outside [0.0, 1.0]")]
    InvalidSamplingRate(f64),

    /// An always-inspect IP rule failed to parse
    #[error("invalid always-inspect ip rule: {0:?}")]
    InvalidIpRule(String),

    /// Circuit breaker failure threshold must be at least 1
    #[error("circuit breaker failure_threshold must be greater than 0")]
    ZeroFailureThreshold,

    /// Circuit breaker half-open trial count must be at least 1
    #[error("circuit breaker half_open_requests must be greater than 0")]
    ZeroHalfOpenRequests,

    /// Per-guard timeout must be non-zero
    #[error("per-guard timeout must be non-zero")]
    ZeroGuardTimeout,

    /// Total pipeline budget must be non-zero
    #[error("total pipeline budget must be non-zero")]
    ZeroTotalBudget,

    /// Threshold strategy needs a level above NONE
    #[error("threshold strategy level must be above NONE")]
    InvalidThresholdLevel,

    /// Enforcement thresholds must satisfy 0 < log < alert < block
    #[error("enforcement thresholds must satisfy 0 < log ({log}) < alert ({alert}) < block ({block})")]
    EnforcementOrdering {
        /// Configured log threshold
        log: usize,
        /// Configured alert threshold
        alert: usize,
        /// Configured block threshold
        block: usize,
    },

    /// Correlation alert threshold must be at least 1
    #[error("correlation alert_threshold must be greater than 0")]
    ZeroCorrelationThreshold,

    /// A time window or cooldown must be non-zero
    #[error("{0} must be non-zero")]
    ZeroWindow(&'static str),

    /// Load shedder resource thresholds must lie in (0, 100]
    #[error("resource threshold {0} is outside (0.0, 100.0]")]
    InvalidResourceThreshold(f32),

    /// Recent-threat ring buffer capacity must be at least 1
    #[error("recent-threat buffer capacity must be greater than 0")]
    ZeroRecentCapacity,

    /// Guard names must be unique within a registry
    #[error("guard {0:?} is already registered")]
    DuplicateGuard(String),
}

/// Error returned by direct single-guard invocation (`inspect_with`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InspectError {
    /// No guard with the given name is registered
    #[error("unknown guard {0:?}")]
    UnknownGuard(String),

    /// The guard's circuit breaker is open
    #[error("circuit for guard {0:?} is open")]
    CircuitOpen(String),

    /// The guard raised an execution failure
    #[error("guard {guard:?} failed: {reason}")]
    GuardFailed {
        /// Name of the failing guard
        guard: String,
        /// Failure description
        reason: String,
    },

    /// The guard exceeded its time budget
    #[error("guard {0:?} timed out")]
    GuardTimeout(String),
}
