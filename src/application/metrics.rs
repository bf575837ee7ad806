//! Engine counters.
//!
//! Lock-free atomic counters updated on the hot path and read out as a
//! consistent-enough snapshot for dashboards and tests. Relaxed ordering is
//! fine here; counters are independent and never used for synchronization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counter set for the inspection engine.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    inspections: AtomicU64,
    sampled_out: AtomicU64,
    dedup_hits: AtomicU64,
    threats_detected: AtomicU64,
    guard_failures: AtomicU64,
    guard_timeouts: AtomicU64,
    circuit_rejections: AtomicU64,
    guards_shed: AtomicU64,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Inspections that entered the engine (admitted or not)
    pub inspections: u64,
    /// Inspections skipped by the admission filter
    pub sampled_out: u64,
    /// Inspections answered from the dedup cache
    pub dedup_hits: u64,
    /// Failing verdicts produced by guards
    pub threats_detected: u64,
    /// Guard invocations that raised an execution failure
    pub guard_failures: u64,
    /// Guard invocations that exceeded their deadline
    pub guard_timeouts: u64,
    /// Guard invocations rejected by an open circuit
    pub circuit_rejections: u64,
    /// Guard invocations dropped by the load shedder
    pub guards_shed: u64,
}

impl Metrics {
    /// Create a fresh counter set.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_inspection(&self) {
        self.inner.inspections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sampled_out(&self) {
        self.inner.sampled_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dedup_hit(&self) {
        self.inner.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_threat(&self) {
        self.inner.threats_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_guard_failure(&self) {
        self.inner.guard_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_guard_timeout(&self) {
        self.inner.guard_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_circuit_rejection(&self) {
        self.inner.circuit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shed(&self, count: u64) {
        self.inner.guards_shed.fetch_add(count, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inspections: self.inner.inspections.load(Ordering::Relaxed),
            sampled_out: self.inner.sampled_out.load(Ordering::Relaxed),
            dedup_hits: self.inner.dedup_hits.load(Ordering::Relaxed),
            threats_detected: self.inner.threats_detected.load(Ordering::Relaxed),
            guard_failures: self.inner.guard_failures.load(Ordering::Relaxed),
            guard_timeouts: self.inner.guard_timeouts.load(Ordering::Relaxed),
            circuit_rejections: self.inner.circuit_rejections.load(Ordering::Relaxed),
            guards_shed: self.inner.guards_shed.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters.
    pub fn reset(&self) {
        self.inner.inspections.store(0, Ordering::Relaxed);
        self.inner.sampled_out.store(0, Ordering::Relaxed);
        self.inner.dedup_hits.store(0, Ordering::Relaxed);
        self.inner.threats_detected.store(0, Ordering::Relaxed);
        self.inner.guard_failures.store(0, Ordering::Relaxed);
        self.inner.guard_timeouts.store(0, Ordering::Relaxed);
        self.inner.circuit_rejections.store(0, Ordering::Relaxed);
        self.inner.guards_shed.store(0, Ordering::Relaxed);
    }
}
