//! Guard execution pipeline.
//!
//! Runs the admitted guard set in descending priority order under the
//! configured strategy, with the circuit breakers, load shedder and
//! per-guard deadline applied around every invocation. No lock is held
//! while a guard runs.

use crate::application::circuit_breaker::BreakerRegistry;
use crate::application::executor::{GuardExecutor, GuardOutcome};
use crate::application::load_shedder::LoadShedder;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Guard};
use crate::application::result::{PipelineResult, SkipReason, SkippedGuard};
use crate::domain::context::InspectionContext;
use crate::domain::verdict::{ThreatLevel, Verdict};
use crate::error::ConfigError;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the pipeline walks the guard list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStrategy {
    /// Run every guard regardless of verdicts
    #[default]
    Full,
    /// Stop at the first failing verdict
    ShortCircuit,
    /// Stop once the maximum observed threat level reaches the given level
    Threshold(ThreatLevel),
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Walk strategy
    pub strategy: PipelineStrategy,
    /// Hard deadline per guard invocation
    pub guard_timeout: Duration,
    /// Total wall-time budget per inspection, checked between guards
    pub total_budget: Duration,
    /// Whether to run guards flagged `quick_scan` as a first pass
    pub quick_scan: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: PipelineStrategy::Full,
            guard_timeout: Duration::from_millis(250),
            total_budget: Duration::from_secs(2),
            quick_scan: false,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guard_timeout.is_zero() {
            return Err(ConfigError::ZeroGuardTimeout);
        }
        if self.total_budget.is_zero() {
            return Err(ConfigError::ZeroTotalBudget);
        }
        if self.strategy == PipelineStrategy::Threshold(ThreatLevel::None) {
            return Err(ConfigError::InvalidThresholdLevel);
        }
        Ok(())
    }
}

/// Executes a prepared guard list and assembles the result.
#[derive(Debug)]
pub struct InspectionPipeline {
    config: PipelineConfig,
    executor: GuardExecutor,
    breakers: Arc<BreakerRegistry>,
    shedder: Arc<LoadShedder>,
    metrics: Metrics,
    clock: Arc<dyn Clock>,
}

impl InspectionPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        config: PipelineConfig,
        breakers: Arc<BreakerRegistry>,
        shedder: Arc<LoadShedder>,
        metrics: Metrics,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = GuardExecutor::new(config.guard_timeout);
        Self {
            config,
            executor,
            breakers,
            shedder,
            metrics,
            clock,
        }
    }

    /// The executor, for direct single-guard invocation.
    pub(crate) fn executor(&self) -> &GuardExecutor {
        &self.executor
    }

    /// Run an inspection over the given guards against a bounded input.
    pub fn execute(
        &self,
        guards: &[Arc<dyn Guard>],
        input: &Value,
        context: &InspectionContext,
    ) -> PipelineResult {
        let start = self.clock.now();
        let mut result = PipelineResult::empty();

        let enabled: Vec<Arc<dyn Guard>> =
            guards.iter().filter(|g| g.enabled()).cloned().collect();

        let (kept, shed) = self.shedder.filter_guards(&enabled);
        self.metrics.record_shed(shed.len() as u64);
        for name in shed {
            result.skipped.push(SkippedGuard::new(name, SkipReason::Shed));
        }

        if self.config.quick_scan {
            let (quick, rest): (Vec<_>, Vec<_>) =
                kept.into_iter().partition(|g| g.quick_scan());
            if !quick.is_empty() {
                self.run_pass(&quick, input, context, start, &mut result);
                if result.threat_detected() {
                    for guard in &rest {
                        result
                            .skipped
                            .push(SkippedGuard::new(guard.name(), SkipReason::ShortCircuited));
                    }
                    result.elapsed = self.clock.now().saturating_duration_since(start);
                    return result;
                }
            }
            self.run_pass(&rest, input, context, start, &mut result);
        } else {
            self.run_pass(&kept, input, context, start, &mut result);
        }

        result.elapsed = self.clock.now().saturating_duration_since(start);
        result
    }

    fn run_pass(
        &self,
        guards: &[Arc<dyn Guard>],
        input: &Value,
        context: &InspectionContext,
        start: Instant,
        result: &mut PipelineResult,
    ) {
        for (idx, guard) in guards.iter().enumerate() {
            if self.clock.now().saturating_duration_since(start) >= self.config.total_budget {
                for remaining in &guards[idx..] {
                    result.skipped.push(SkippedGuard::new(
                        remaining.name(),
                        SkipReason::BudgetExhausted,
                    ));
                }
                return;
            }

            let breaker = self.breakers.breaker_for(guard.name());
            if !breaker.try_acquire() {
                self.metrics.record_circuit_rejection();
                result
                    .skipped
                    .push(SkippedGuard::new(guard.name(), SkipReason::CircuitOpen));
                continue;
            }

            result.guards_executed += 1;
            match self.executor.run(guard, input, context) {
                GuardOutcome::Verdict(verdict) => {
                    breaker.record_success();
                    let stop = self.stop_after(&verdict, result);
                    result.verdicts.push(verdict);
                    if stop {
                        for remaining in &guards[idx + 1..] {
                            result.skipped.push(SkippedGuard::new(
                                remaining.name(),
                                SkipReason::ShortCircuited,
                            ));
                        }
                        return;
                    }
                }
                GuardOutcome::Failed(_reason) => {
                    breaker.record_failure();
                    self.metrics.record_guard_failure();
                    result
                        .skipped
                        .push(SkippedGuard::new(guard.name(), SkipReason::Failed));
                }
                GuardOutcome::TimedOut => {
                    breaker.record_failure();
                    self.metrics.record_guard_timeout();
                    result
                        .skipped
                        .push(SkippedGuard::new(guard.name(), SkipReason::TimedOut));
                }
            }
        }
    }

    /// Whether the strategy stops the walk after this verdict.
    ///
    /// Short-circuiting keys on the verdict's pass/fail flag, the same test
    /// every other threat check in the engine uses; the threat level is
    /// only consulted by the threshold strategy.
    fn stop_after(&self, verdict: &Verdict, result: &PipelineResult) -> bool {
        match self.config.strategy {
            PipelineStrategy::Full => false,
            PipelineStrategy::ShortCircuit => verdict.is_threat(),
            PipelineStrategy::Threshold(threshold) => {
                verdict.level >= threshold || result.max_threat_level() >= threshold
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::application::load_shedder::LoadShedderConfig;
    use crate::infrastructure::mocks::{
        GuardBehavior, MockClock, MockProbe, ScriptedGuard, StaticGuard,
    };
    use serde_json::json;

    struct Harness {
        pipeline: InspectionPipeline,
        probe: Arc<MockProbe>,
        breakers: Arc<BreakerRegistry>,
    }

    fn harness(config: PipelineConfig) -> Harness {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let breakers = Arc::new(BreakerRegistry::new(
            CircuitBreakerConfig {
                failure_threshold: 3,
                recovery_timeout: Duration::from_secs(30),
                half_open_requests: 1,
            },
            clock.clone(),
        ));
        let probe = Arc::new(MockProbe::new(10.0, 10.0));
        let shedder = Arc::new(LoadShedder::new(
            LoadShedderConfig::default(),
            probe.clone(),
        ));
        Harness {
            pipeline: InspectionPipeline::new(
                config,
                breakers.clone(),
                shedder,
                Metrics::new(),
                clock,
            ),
            probe,
            breakers,
        }
    }

    fn passing(name: &'static str) -> Arc<dyn Guard> {
        Arc::new(StaticGuard::passing(name))
    }

    fn threatening(name: &'static str, level: ThreatLevel) -> Arc<dyn Guard> {
        Arc::new(StaticGuard::threat(name, level))
    }

    fn run(h: &Harness, guards: &[Arc<dyn Guard>]) -> PipelineResult {
        h.pipeline
            .execute(guards, &json!({"q": "input"}), &InspectionContext::new())
    }

    #[test]
    fn test_full_strategy_runs_every_guard() {
        let h = harness(PipelineConfig {
            strategy: PipelineStrategy::Full,
            ..Default::default()
        });
        let guards = vec![
            threatening("a", ThreatLevel::High),
            passing("b"),
            threatening("c", ThreatLevel::Low),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 3);
        assert_eq!(result.verdicts.len(), 3);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_short_circuit_stops_at_first_threat() {
        let h = harness(PipelineConfig {
            strategy: PipelineStrategy::ShortCircuit,
            ..Default::default()
        });
        let guards = vec![
            passing("a"),
            threatening("b", ThreatLevel::Medium),
            passing("c"),
            passing("d"),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 2);
        assert_eq!(result.verdicts.len(), 2);
        assert_eq!(
            result.skipped_for(SkipReason::ShortCircuited),
            vec!["c", "d"]
        );
    }

    #[test]
    fn test_threshold_strategy_stops_at_level() {
        let h = harness(PipelineConfig {
            strategy: PipelineStrategy::Threshold(ThreatLevel::High),
            ..Default::default()
        });
        let guards = vec![
            threatening("low", ThreatLevel::Low),
            threatening("medium", ThreatLevel::Medium),
            threatening("high", ThreatLevel::High),
            passing("after"),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 3, "low and medium do not stop the walk");
        assert_eq!(result.skipped_for(SkipReason::ShortCircuited), vec!["after"]);
    }

    #[test]
    fn test_disabled_guards_are_not_invoked() {
        let h = harness(PipelineConfig::default());
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(StaticGuard::passing("on")),
            Arc::new(StaticGuard::passing("off").disabled()),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 1);
        assert_eq!(result.verdicts[0].guard, "on");
    }

    #[test]
    fn test_failing_guard_is_skipped_not_fatal() {
        let h = harness(PipelineConfig::default());
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(ScriptedGuard::new("broken", vec![GuardBehavior::Fail])),
            passing("healthy"),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.verdicts.len(), 1);
        assert_eq!(result.skipped_for(SkipReason::Failed), vec!["broken"]);
    }

    #[test]
    fn test_breaker_opens_after_repeated_failures() {
        let h = harness(PipelineConfig::default());
        let guards: Vec<Arc<dyn Guard>> = vec![Arc::new(ScriptedGuard::new(
            "flaky",
            vec![GuardBehavior::Fail; 8],
        ))];
        for _ in 0..3 {
            run(&h, &guards);
        }
        assert_eq!(h.breakers.state("flaky"), CircuitState::Open);

        // Fourth run is rejected without invoking the guard.
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 0);
        assert_eq!(result.skipped_for(SkipReason::CircuitOpen), vec!["flaky"]);
    }

    #[test]
    fn test_shed_guards_recorded_with_reason() {
        let h = harness(PipelineConfig::default());
        h.probe.set(99.9, 10.0);
        let guards = vec![passing("a"), passing("b")];
        let result = run(&h, &guards);
        // Default tier is medium, shed under severe pressure.
        assert_eq!(result.guards_executed, 0);
        assert_eq!(result.skipped_for(SkipReason::Shed).len(), 2);
    }

    #[test]
    fn test_quick_scan_threat_skips_full_pass() {
        let h = harness(PipelineConfig {
            quick_scan: true,
            ..Default::default()
        });
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(StaticGuard::threat("cheap", ThreatLevel::High).quick()),
            passing("expensive"),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 1);
        assert_eq!(
            result.skipped_for(SkipReason::ShortCircuited),
            vec!["expensive"]
        );
    }

    #[test]
    fn test_quick_scan_clean_falls_through_to_full_set() {
        let h = harness(PipelineConfig {
            quick_scan: true,
            ..Default::default()
        });
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(StaticGuard::passing("cheap").quick()),
            threatening("deep", ThreatLevel::Medium),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 2);
        assert!(result.threat_detected());
    }

    #[test]
    fn test_empty_guard_list_yields_empty_result() {
        let h = harness(PipelineConfig::default());
        let result = run(&h, &[]);
        assert!(result.verdicts.is_empty());
        assert!(!result.threat_detected());
    }

    #[test]
    fn test_budget_exhaustion_skips_remaining_guards() {
        use crate::application::ports::GuardError;

        // Advances the shared clock when invoked, so the budget check
        // before the next guard sees the overrun.
        struct ClockAdvancingGuard {
            name: &'static str,
            clock: Arc<MockClock>,
            by: Duration,
        }

        impl Guard for ClockAdvancingGuard {
            fn name(&self) -> &str {
                self.name
            }
            fn inspect(
                &self,
                _input: &Value,
                _context: &InspectionContext,
            ) -> Result<crate::domain::verdict::Verdict, GuardError> {
                self.clock.advance(self.by);
                Ok(Verdict::pass(self.name))
            }
        }

        let clock = Arc::new(MockClock::new(Instant::now()));
        let breakers = Arc::new(BreakerRegistry::new(
            CircuitBreakerConfig::default(),
            clock.clone(),
        ));
        let shedder = Arc::new(LoadShedder::new(
            LoadShedderConfig::default(),
            Arc::new(MockProbe::new(10.0, 10.0)),
        ));
        let pipeline = InspectionPipeline::new(
            PipelineConfig {
                total_budget: Duration::from_millis(100),
                ..Default::default()
            },
            breakers,
            shedder,
            Metrics::new(),
            clock.clone(),
        );

        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(ClockAdvancingGuard {
                name: "slow",
                clock: clock.clone(),
                by: Duration::from_millis(150),
            }),
            Arc::new(StaticGuard::passing("second")),
            Arc::new(StaticGuard::passing("third")),
        ];
        let result = pipeline.execute(&guards, &json!({}), &InspectionContext::new());

        assert_eq!(result.guards_executed, 1, "only the first guard ran");
        assert_eq!(result.verdicts.len(), 1);
        assert_eq!(
            result.skipped_for(SkipReason::BudgetExhausted),
            vec!["second", "third"]
        );
        assert!(result.elapsed >= Duration::from_millis(150));
    }

    #[test]
    fn test_short_circuit_keys_on_the_pass_flag() {
        use crate::application::ports::GuardError;

        // A failing verdict whose level was left at the default must still
        // short-circuit; the pass flag is the threat test, not the level.
        struct FlagOnlyGuard(&'static str);

        impl Guard for FlagOnlyGuard {
            fn name(&self) -> &str {
                self.0
            }
            fn inspect(
                &self,
                _input: &Value,
                _context: &InspectionContext,
            ) -> Result<crate::domain::verdict::Verdict, GuardError> {
                Ok(Verdict {
                    guard: self.0.to_string(),
                    passed: false,
                    level: ThreatLevel::None,
                    message: "flagged without a level".to_string(),
                    metadata: serde_json::Map::new(),
                })
            }
        }

        let h = harness(PipelineConfig {
            strategy: PipelineStrategy::ShortCircuit,
            ..Default::default()
        });
        let guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(FlagOnlyGuard("flag")),
            Arc::new(StaticGuard::passing("after")),
        ];
        let result = run(&h, &guards);
        assert_eq!(result.guards_executed, 1);
        assert!(result.threat_detected());
        assert_eq!(result.skipped_for(SkipReason::ShortCircuited), vec!["after"]);
    }

    #[test]
    fn test_config_validation() {
        let bad = PipelineConfig {
            guard_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::ZeroGuardTimeout));

        let bad = PipelineConfig {
            strategy: PipelineStrategy::Threshold(ThreatLevel::None),
            ..Default::default()
        };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidThresholdLevel));

        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_verdict_order_matches_execution_order() {
        let h = harness(PipelineConfig::default());
        let guards = vec![passing("first"), passing("second"), passing("third")];
        let result = run(&h, &guards);
        let names: Vec<_> = result.verdicts.iter().map(|v| v.guard.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
