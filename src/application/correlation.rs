//! Sliding-window violation correlation.
//!
//! Tracks failing verdicts per identifier (ip, user, session) inside a
//! rolling window and signals the configured sink when an identifier's
//! retained count crosses the alert threshold. The signal fires once per
//! crossing and re-arms only after the count falls back under the threshold.

use crate::application::ports::{Clock, CorrelationAlert, CorrelationSink};
use crate::domain::context::IdentifierKind;
use crate::error::ConfigError;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Configuration for the correlation tracker.
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Sliding window length
    pub window: Duration,
    /// Retained-count threshold that triggers the alert signal
    pub alert_threshold: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
            alert_threshold: 10,
        }
    }
}

impl CorrelationConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_threshold == 0 {
            return Err(ConfigError::ZeroCorrelationThreshold);
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow("correlation window"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CorrelationKey {
    kind: IdentifierKind,
    identifier: String,
}

#[derive(Debug, Default)]
struct CorrelationRecord {
    timestamps: VecDeque<Instant>,
    // Set while the count sits at or above threshold; cleared when pruning
    // drops it back under, which re-arms the signal.
    alerted: bool,
}

impl CorrelationRecord {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Per-identifier sliding-window violation counter with single-fire alerts.
///
/// Pruning is lazy: a record's window is rolled forward whenever that record
/// is touched. The sink is invoked outside the map entry's guard, so a slow
/// or panicking sink never blocks other identifiers.
pub struct CorrelationTracker {
    records: DashMap<CorrelationKey, CorrelationRecord, ahash::RandomState>,
    config: CorrelationConfig,
    clock: Arc<dyn Clock>,
    sink: Option<Arc<dyn CorrelationSink>>,
}

impl CorrelationTracker {
    /// Create a tracker; `sink` receives threshold-exceeded signals.
    pub fn new(
        config: CorrelationConfig,
        clock: Arc<dyn Clock>,
        sink: Option<Arc<dyn CorrelationSink>>,
    ) -> Self {
        Self {
            records: DashMap::with_hasher(ahash::RandomState::new()),
            config,
            clock,
            sink,
        }
    }

    /// Record one violation for an identifier.
    ///
    /// Prunes the identifier's window, appends the violation, and fires the
    /// alert signal if the retained count just crossed the threshold.
    pub fn record_violation(&self, kind: IdentifierKind, identifier: &str) {
        let now = self.clock.now();
        let key = CorrelationKey {
            kind,
            identifier: identifier.to_string(),
        };

        let alert = {
            let mut record = self.records.entry(key).or_default();
            record.prune(now, self.config.window);
            if record.timestamps.len() < self.config.alert_threshold {
                record.alerted = false;
            }
            record.timestamps.push_back(now);

            let crossed =
                record.timestamps.len() >= self.config.alert_threshold && !record.alerted;
            if crossed {
                record.alerted = true;
                Some(CorrelationAlert {
                    kind,
                    identifier: identifier.to_string(),
                    count: record.timestamps.len(),
                    window: self.config.window,
                })
            } else {
                None
            }
        };

        if let Some(alert) = alert {
            warn!(
                kind = alert.kind.as_str(),
                identifier = %alert.identifier,
                count = alert.count,
                "correlation threshold exceeded"
            );
            if let Some(sink) = &self.sink {
                if panic::catch_unwind(AssertUnwindSafe(|| sink.threshold_exceeded(&alert)))
                    .is_err()
                {
                    warn!(identifier = %alert.identifier, "correlation sink panicked");
                }
            }
        }
    }

    /// Current retained violation count for an identifier.
    ///
    /// Read-only apart from rolling the window forward; never fires alerts.
    pub fn stats(&self, kind: IdentifierKind, identifier: &str) -> usize {
        let now = self.clock.now();
        let key = CorrelationKey {
            kind,
            identifier: identifier.to_string(),
        };
        match self.records.get_mut(&key) {
            Some(mut record) => {
                record.prune(now, self.config.window);
                record.timestamps.len()
            }
            None => 0,
        }
    }

    /// Drop all tracked identifiers.
    pub fn reset(&self) {
        self.records.clear();
    }
}

impl std::fmt::Debug for CorrelationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationTracker")
            .field("config", &self.config)
            .field("tracked", &self.records.len())
            .finish()
    }
}
