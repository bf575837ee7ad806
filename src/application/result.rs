//! Pipeline output types.

use crate::domain::verdict::{ThreatLevel, Verdict};
use serde::Serialize;
use std::time::Duration;

/// Why a guard was skipped instead of producing a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The guard's circuit breaker rejected the call
    CircuitOpen,
    /// The load shedder dropped the guard's tier
    Shed,
    /// The guard exceeded its per-invocation deadline
    TimedOut,
    /// The guard raised an execution failure
    Failed,
    /// An earlier verdict satisfied the strategy's stop condition
    ShortCircuited,
    /// The total pipeline budget ran out before this guard started
    BudgetExhausted,
}

impl SkipReason {
    /// Short name for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::CircuitOpen => "circuit_open",
            SkipReason::Shed => "shed",
            SkipReason::TimedOut => "timed_out",
            SkipReason::Failed => "failed",
            SkipReason::ShortCircuited => "short_circuited",
            SkipReason::BudgetExhausted => "budget_exhausted",
        }
    }
}

/// A guard that did not contribute a verdict, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGuard {
    /// Guard name
    pub name: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

impl SkippedGuard {
    pub(crate) fn new(name: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }
}

/// Outcome of one inspection.
///
/// Always well-formed: a run where every guard was skipped (or the request
/// was not admitted) yields an empty verdict list, which callers treat as
/// "no threat found".
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    /// Verdicts from guards that completed, in execution order
    pub verdicts: Vec<Verdict>,
    /// Guards that were skipped, with reasons
    pub skipped: Vec<SkippedGuard>,
    /// Number of guards actually invoked
    pub guards_executed: usize,
    /// Wall time spent in the pipeline
    pub elapsed: Duration,
}

impl PipelineResult {
    /// An empty result (nothing ran).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any completed guard flagged a threat.
    pub fn threat_detected(&self) -> bool {
        self.verdicts.iter().any(|v| v.is_threat())
    }

    /// Highest threat level across all verdicts.
    pub fn max_threat_level(&self) -> ThreatLevel {
        self.verdicts
            .iter()
            .map(|v| v.level)
            .max()
            .unwrap_or(ThreatLevel::None)
    }

    /// The most severe failing verdict, if any.
    ///
    /// Ties resolve to the earliest verdict in execution order.
    pub fn worst_verdict(&self) -> Option<&Verdict> {
        let mut worst: Option<&Verdict> = None;
        for verdict in self.verdicts.iter().filter(|v| v.is_threat()) {
            if worst.map_or(true, |w| verdict.level > w.level) {
                worst = Some(verdict);
            }
        }
        worst
    }

    /// Names of guards skipped for the given reason.
    pub fn skipped_for(&self, reason: SkipReason) -> Vec<&str> {
        self.skipped
            .iter()
            .filter(|s| s.reason == reason)
            .map(|s| s.name.as_str())
            .collect()
    }
}
