//! Guard invocation with a hard per-guard deadline.
//!
//! Each invocation runs on its own named worker thread; the caller waits on
//! a bounded channel with `recv_timeout`. On overrun the caller walks away:
//! the worker may still finish, but its send fails against the dropped
//! receiver and the verdict is discarded, never committed anywhere.

use crate::application::ports::Guard;
use crate::domain::context::InspectionContext;
use crate::domain::verdict::Verdict;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// What a single guard invocation produced.
///
/// Failures are data here, not errors: the pipeline turns `Failed` and
/// `TimedOut` into skip entries and circuit-breaker failures.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// The guard completed (passing or failing verdict)
    Verdict(Verdict),
    /// The guard returned an error or panicked
    Failed(String),
    /// The guard exceeded its deadline
    TimedOut,
}

/// Runs guards with panic containment and a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct GuardExecutor {
    timeout: Duration,
}

impl GuardExecutor {
    /// Create an executor with the given per-guard deadline.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured per-guard deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Invoke one guard against an already-bounded input.
    pub fn run(
        &self,
        guard: &Arc<dyn Guard>,
        input: &Value,
        context: &InspectionContext,
    ) -> GuardOutcome {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let guard = guard.clone();
        let input = input.clone();
        let context = context.clone();
        let name = guard.name().to_string();

        let spawned = std::thread::Builder::new()
            .name(format!("guard-{name}"))
            .spawn(move || {
                let outcome =
                    match panic::catch_unwind(AssertUnwindSafe(|| guard.inspect(&input, &context)))
                    {
                        Ok(Ok(verdict)) => GuardOutcome::Verdict(verdict),
                        Ok(Err(err)) => GuardOutcome::Failed(err.0),
                        Err(_) => GuardOutcome::Failed("guard panicked".to_string()),
                    };
                // Receiver is gone if the caller already timed out.
                let _ = tx.send(outcome);
            });

        if let Err(err) = spawned {
            warn!(guard = %name, error = %err, "failed to spawn guard worker");
            return GuardOutcome::Failed(format!("spawn failed: {err}"));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(guard = %name, timeout_ms = self.timeout.as_millis() as u64, "guard deadline exceeded");
                GuardOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GuardError;
    use crate::domain::verdict::ThreatLevel;
    use serde_json::json;

    struct FnGuard<F>(&'static str, F);

    impl<F> Guard for FnGuard<F>
    where
        F: Fn() -> Result<Verdict, GuardError> + Send + Sync,
    {
        fn name(&self) -> &str {
            self.0
        }
        fn inspect(
            &self,
            _input: &Value,
            _context: &InspectionContext,
        ) -> Result<Verdict, GuardError> {
            (self.1)()
        }
    }

    fn run<F>(timeout_ms: u64, name: &'static str, f: F) -> GuardOutcome
    where
        F: Fn() -> Result<Verdict, GuardError> + Send + Sync + 'static,
    {
        let executor = GuardExecutor::new(Duration::from_millis(timeout_ms));
        let guard: Arc<dyn Guard> = Arc::new(FnGuard(name, f));
        executor.run(&guard, &json!({}), &InspectionContext::new())
    }

    #[test]
    fn test_completed_verdict_passes_through() {
        let outcome = run(1000, "ok", || {
            Ok(Verdict::threat("ok", ThreatLevel::High, "found"))
        });
        match outcome {
            GuardOutcome::Verdict(v) => assert_eq!(v.level, ThreatLevel::High),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_guard_error_becomes_failed() {
        let outcome = run(1000, "broken", || Err(GuardError::new("backend down")));
        assert_eq!(outcome, GuardOutcome::Failed("backend down".to_string()));
    }

    #[test]
    fn test_guard_panic_is_contained() {
        let outcome = run(1000, "panicky", || panic!("boom"));
        assert_eq!(outcome, GuardOutcome::Failed("guard panicked".to_string()));
    }

    #[test]
    fn test_slow_guard_times_out() {
        let outcome = run(20, "slow", || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(Verdict::pass("slow"))
        });
        assert_eq!(outcome, GuardOutcome::TimedOut);
    }

    #[test]
    fn test_fast_guard_beats_deadline() {
        let outcome = run(500, "fast", || Ok(Verdict::pass("fast")));
        assert!(matches!(outcome, GuardOutcome::Verdict(_)));
    }
}
