//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces the application
//! layer needs from the outside world. Infrastructure adapters (and the
//! host application) implement them: detectors implement [`Guard`], the
//! host supplies a [`ResourceProbe`] and sinks, and [`Clock`] keeps every
//! time-based component deterministic under test.

use crate::domain::context::{IdentifierKind, InspectionContext};
use crate::domain::verdict::Verdict;
use serde_json::Value;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure raised by a guard during inspection.
///
/// Guards report detection findings through their [`Verdict`]; this error is
/// strictly for execution failure (broken detector, unavailable dependency).
/// It is recorded as a circuit-breaker failure and never promoted to a
/// threat verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GuardError(pub String);

impl GuardError {
    /// Create a guard error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        GuardError(message.into())
    }
}

/// A pluggable threat detector.
///
/// Guards are stateless functions of `(input, context) -> Verdict` from the
/// engine's point of view. They are registered once at startup and invoked
/// by the pipeline in descending priority order. A guard may fail or exceed
/// its time budget; both are contained by the executor and circuit breaker
/// and never crash an inspection.
pub trait Guard: Send + Sync {
    /// Unique name of this guard.
    fn name(&self) -> &str;

    /// Scheduling priority; higher runs earlier.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether this guard participates in inspection at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether this guard is cheap enough for the quick-scan pass.
    fn quick_scan(&self) -> bool {
        false
    }

    /// Inspect a (bounded) input and produce a verdict.
    fn inspect(&self, input: &Value, context: &InspectionContext) -> Result<Verdict, GuardError>;
}

/// Port for obtaining current time.
///
/// All TTLs, windows, cooldowns and breaker timeouts go through this trait
/// so tests can drive time explicitly with a mock.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// One CPU/memory sample from the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceSample {
    /// CPU utilization in percent (0..=100)
    pub cpu_percent: f32,
    /// Memory utilization in percent (0..=100)
    pub memory_percent: f32,
}

/// Port for host resource metrics, polled by the load shedder.
pub trait ResourceProbe: Send + Sync + Debug {
    /// Take a CPU/memory sample.
    fn sample(&self) -> ResourceSample;
}

/// Port for delivering failing verdicts to a reporting backend.
///
/// Called fire-and-forget for every failing verdict. Sink panics are
/// contained by the orchestrator and never affect the inspection result.
pub trait ReporterSink: Send + Sync {
    /// Deliver one failing verdict together with its request context.
    fn report(&self, verdict: &Verdict, context: &InspectionContext);
}

/// Event emitted when an identifier crosses the correlation threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationAlert {
    /// Which identifier kind crossed the threshold
    pub kind: IdentifierKind,
    /// The identifier value
    pub identifier: String,
    /// Violations retained in the window at the moment of crossing
    pub count: usize,
    /// The configured correlation window
    pub window: Duration,
}

/// Port for consuming correlation threshold-exceeded signals.
///
/// Advisory and non-blocking; consumer panics are contained.
pub trait CorrelationSink: Send + Sync {
    /// Receive one threshold-exceeded event.
    fn threshold_exceeded(&self, alert: &CorrelationAlert);
}
