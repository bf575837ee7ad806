//! The inspection orchestrator.
//!
//! `Warden` wires every component together and owns the per-request flow:
//! admission sampling, input bounding, dedup lookup, pipeline execution,
//! then correlation, enforcement and reporting for each failing verdict.
//! Construction goes through `WardenBuilder`; all configuration validation
//! happens in `build()`, so an engine that constructed successfully never
//! raises configuration errors at request time.

use crate::application::admission::{AdmissionFilter, SamplingConfig};
use crate::application::circuit_breaker::{BreakerRegistry, CircuitBreakerConfig, CircuitState};
use crate::application::correlation::{CorrelationConfig, CorrelationTracker};
use crate::application::dedup::{DedupCache, DedupConfig};
use crate::application::enforcement::{EnforcementConfig, EnforcementLevel, EnforcementTracker};
use crate::application::executor::GuardOutcome;
use crate::application::load_shedder::{LoadShedder, LoadShedderConfig, SystemHealth};
use crate::application::metrics::{Metrics, MetricsSnapshot};
use crate::application::pipeline::{InspectionPipeline, PipelineConfig};
use crate::application::ports::{Clock, CorrelationSink, Guard, ReporterSink, ResourceProbe};
use crate::application::registry::GuardRegistry;
use crate::application::result::PipelineResult;
use crate::domain::bounding::InputBounds;
use crate::domain::context::{IdentifierKind, InspectionContext};
use crate::domain::fingerprint::InputFingerprint;
use crate::domain::verdict::Verdict;
use crate::error::{ConfigError, InspectError};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::resources::IdleProbe;
use crate::infrastructure::ring_buffer::RingBuffer;
use crate::infrastructure::sinks::TracingReporter;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Complete engine configuration.
///
/// Defaults are production-plausible; every section can be replaced
/// wholesale through the builder.
#[derive(Debug, Clone, Default)]
pub struct WardenConfig {
    /// Admission sampling and always-inspect overrides
    pub sampling: SamplingConfig,
    /// Input size/depth caps
    pub bounds: InputBounds,
    /// Verdict dedup cache
    pub dedup: DedupConfig,
    /// Per-guard circuit breakers
    pub breaker: CircuitBreakerConfig,
    /// Tier-based load shedding
    pub shedder: LoadShedderConfig,
    /// Pipeline strategy and time budgets
    pub pipeline: PipelineConfig,
    /// Cross-request violation correlation
    pub correlation: CorrelationConfig,
    /// Progressive per-identifier enforcement
    pub enforcement: EnforcementConfig,
    /// How many recent failing verdicts to retain
    pub recent_capacity: usize,
}

impl WardenConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.sampling.validate()?;
        self.dedup.validate()?;
        self.breaker.validate()?;
        self.shedder.validate()?;
        self.pipeline.validate()?;
        self.correlation.validate()?;
        self.enforcement.validate()?;
        if self.recent_capacity == 0 {
            return Err(ConfigError::ZeroRecentCapacity);
        }
        Ok(())
    }
}

/// Builder for [`Warden`].
pub struct WardenBuilder {
    config: WardenConfig,
    guards: Vec<Arc<dyn Guard>>,
    clock: Arc<dyn Clock>,
    probe: Arc<dyn ResourceProbe>,
    reporter: Arc<dyn ReporterSink>,
    correlation_sink: Option<Arc<dyn CorrelationSink>>,
    on_threat_evicted: Option<Box<dyn FnMut(Verdict) + Send>>,
}

impl Default for WardenBuilder {
    fn default() -> Self {
        Self {
            config: WardenConfig {
                recent_capacity: 128,
                ..Default::default()
            },
            guards: Vec::new(),
            clock: Arc::new(SystemClock),
            probe: Arc::new(IdleProbe),
            reporter: Arc::new(TracingReporter),
            correlation_sink: None,
            on_threat_evicted: None,
        }
    }
}

impl WardenBuilder {
    /// Start a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration at once.
    pub fn with_config(mut self, config: WardenConfig) -> Self {
        self.config = config;
        self
    }

    /// Set admission sampling.
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.config.sampling = sampling;
        self
    }

    /// Set input bounding caps.
    pub fn with_bounds(mut self, bounds: InputBounds) -> Self {
        self.config.bounds = bounds;
        self
    }

    /// Set dedup cache parameters.
    pub fn with_dedup(mut self, dedup: DedupConfig) -> Self {
        self.config.dedup = dedup;
        self
    }

    /// Set circuit breaker parameters (shared by all per-guard breakers).
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.config.breaker = breaker;
        self
    }

    /// Set load shedding thresholds and tiers.
    pub fn with_shedder(mut self, shedder: LoadShedderConfig) -> Self {
        self.config.shedder = shedder;
        self
    }

    /// Set pipeline strategy and time budgets.
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.config.pipeline = pipeline;
        self
    }

    /// Set correlation window and threshold.
    pub fn with_correlation(mut self, correlation: CorrelationConfig) -> Self {
        self.config.correlation = correlation;
        self
    }

    /// Set enforcement thresholds and cooldown.
    pub fn with_enforcement(mut self, enforcement: EnforcementConfig) -> Self {
        self.config.enforcement = enforcement;
        self
    }

    /// Set how many recent failing verdicts are retained.
    pub fn with_recent_capacity(mut self, capacity: usize) -> Self {
        self.config.recent_capacity = capacity;
        self
    }

    /// Register a guard. Duplicate names are rejected at build time.
    pub fn register_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guards.push(guard);
        self
    }

    /// Replace the clock (tests inject a mock here).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the resource probe.
    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replace the reporter sink.
    pub fn with_reporter(mut self, reporter: Arc<dyn ReporterSink>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Attach a correlation alert sink.
    pub fn with_correlation_sink(mut self, sink: Arc<dyn CorrelationSink>) -> Self {
        self.correlation_sink = Some(sink);
        self
    }

    /// Observe failing verdicts as they age out of the recent buffer.
    pub fn on_threat_evicted(mut self, observer: impl FnMut(Verdict) + Send + 'static) -> Self {
        self.on_threat_evicted = Some(Box::new(observer));
        self
    }

    /// Validate everything and assemble the engine.
    pub fn build(self) -> Result<Warden, ConfigError> {
        self.config.validate()?;

        let mut registry = GuardRegistry::new();
        for guard in self.guards {
            registry.register(guard)?;
        }

        let admission = AdmissionFilter::new(self.config.sampling.clone())?;
        let metrics = Metrics::new();
        let breakers = Arc::new(BreakerRegistry::new(
            self.config.breaker.clone(),
            self.clock.clone(),
        ));
        let shedder = Arc::new(LoadShedder::new(
            self.config.shedder.clone(),
            self.probe.clone(),
        ));
        let pipeline = InspectionPipeline::new(
            self.config.pipeline.clone(),
            breakers.clone(),
            shedder.clone(),
            metrics.clone(),
            self.clock.clone(),
        );
        let recent = match self.on_threat_evicted {
            Some(observer) => {
                RingBuffer::with_eviction_callback(self.config.recent_capacity, observer)
            }
            None => RingBuffer::new(self.config.recent_capacity),
        };

        Ok(Warden {
            registry,
            admission,
            bounds: self.config.bounds,
            dedup: DedupCache::new(self.config.dedup.clone(), self.clock.clone()),
            breakers,
            shedder,
            pipeline,
            correlation: CorrelationTracker::new(
                self.config.correlation.clone(),
                self.clock.clone(),
                self.correlation_sink,
            ),
            enforcement: EnforcementTracker::new(
                self.config.enforcement.clone(),
                self.clock.clone(),
            ),
            reporter: self.reporter,
            metrics,
            recent: Mutex::new(recent),
        })
    }
}

/// The inspection engine.
///
/// One instance serves the whole process; every method takes `&self` and is
/// safe to call from any thread.
pub struct Warden {
    registry: GuardRegistry,
    admission: AdmissionFilter,
    bounds: InputBounds,
    dedup: DedupCache,
    breakers: Arc<BreakerRegistry>,
    shedder: Arc<LoadShedder>,
    pipeline: InspectionPipeline,
    correlation: CorrelationTracker,
    enforcement: EnforcementTracker,
    reporter: Arc<dyn ReporterSink>,
    metrics: Metrics,
    recent: Mutex<RingBuffer<Verdict>>,
}

impl Warden {
    /// Start building an engine.
    pub fn builder() -> WardenBuilder {
        WardenBuilder::new()
    }

    /// Inspect one payload against every registered guard.
    pub fn inspect(&self, input: &Value, context: &InspectionContext) -> PipelineResult {
        self.inspect_guards(input, context, None)
    }

    /// Inspect against only the named guards (priority order preserved,
    /// unknown names ignored).
    pub fn inspect_subset(
        &self,
        input: &Value,
        context: &InspectionContext,
        names: &[&str],
    ) -> PipelineResult {
        self.inspect_guards(input, context, Some(names))
    }

    fn inspect_guards(
        &self,
        input: &Value,
        context: &InspectionContext,
        subset: Option<&[&str]>,
    ) -> PipelineResult {
        self.metrics.record_inspection();

        if !self.admission.should_inspect(context) {
            self.metrics.record_sampled_out();
            return PipelineResult::empty();
        }

        let (bounded, _truncated) = self.bounds.apply(input);
        let fingerprint = InputFingerprint::of(&bounded);

        if let Some(cached) = self.dedup.get(fingerprint) {
            self.metrics.record_dedup_hit();
            let result = PipelineResult {
                verdicts: vec![cached],
                ..Default::default()
            };
            // A repeat of a known-bad payload still counts against its
            // sender: correlation, enforcement and reporting all see it.
            self.commit_threats(&result, context);
            return result;
        }

        let result = match subset {
            Some(names) => {
                let guards = self.registry.subset(names);
                self.pipeline.execute(&guards, &bounded, context)
            }
            None => self
                .pipeline
                .execute(self.registry.guards(), &bounded, context),
        };

        for _ in result.verdicts.iter().filter(|v| v.is_threat()) {
            self.metrics.record_threat();
        }
        self.commit_threats(&result, context);

        // Only failing verdicts are cached; a clean pass is cheap to redo
        // and must not mask a guard set that changes behavior.
        if let Some(worst) = result.worst_verdict() {
            self.dedup.put(fingerprint, worst.clone());
        }
        result
    }

    /// Run a single guard directly, bypassing admission, dedup and the walk
    /// strategy. The per-guard deadline and circuit breaker still apply.
    pub fn inspect_with(
        &self,
        guard_name: &str,
        input: &Value,
        context: &InspectionContext,
    ) -> Result<Verdict, InspectError> {
        let guard = self
            .registry
            .get(guard_name)
            .ok_or_else(|| InspectError::UnknownGuard(guard_name.to_string()))?;

        let breaker = self.breakers.breaker_for(guard_name);
        if !breaker.try_acquire() {
            self.metrics.record_circuit_rejection();
            return Err(InspectError::CircuitOpen(guard_name.to_string()));
        }

        let (bounded, _truncated) = self.bounds.apply(input);
        match self.pipeline.executor().run(guard, &bounded, context) {
            GuardOutcome::Verdict(verdict) => {
                breaker.record_success();
                Ok(verdict)
            }
            GuardOutcome::Failed(reason) => {
                breaker.record_failure();
                self.metrics.record_guard_failure();
                Err(InspectError::GuardFailed {
                    guard: guard_name.to_string(),
                    reason,
                })
            }
            GuardOutcome::TimedOut => {
                breaker.record_failure();
                self.metrics.record_guard_timeout();
                Err(InspectError::GuardTimeout(guard_name.to_string()))
            }
        }
    }

    /// Feed every failing verdict through reporting, correlation,
    /// enforcement and the recent-threat buffer.
    fn commit_threats(&self, result: &PipelineResult, context: &InspectionContext) {
        let identifiers = context.identifiers();
        for verdict in result.verdicts.iter().filter(|v| v.is_threat()) {
            if panic::catch_unwind(AssertUnwindSafe(|| self.reporter.report(verdict, context)))
                .is_err()
            {
                warn!(guard = %verdict.guard, "reporter sink panicked");
            }
            for (kind, identifier) in &identifiers {
                self.correlation.record_violation(*kind, identifier);
                self.enforcement.record_violation(identifier);
            }
            self.recent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(verdict.clone());
        }
    }

    /// Circuit state for a guard (CLOSED if it never tripped).
    pub fn circuit_state(&self, guard_name: &str) -> CircuitState {
        self.breakers.state(guard_name)
    }

    /// Host health as last seen by the load shedder.
    pub fn load_health(&self) -> SystemHealth {
        self.shedder.system_health()
    }

    /// Violations currently retained for an identifier.
    pub fn correlation_stats(&self, kind: IdentifierKind, identifier: &str) -> usize {
        self.correlation.stats(kind, identifier)
    }

    /// Current enforcement level for an identifier.
    pub fn enforcement_level(&self, identifier: &str) -> EnforcementLevel {
        self.enforcement.level(identifier)
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Up to `n` most recent failing verdicts, newest first.
    pub fn recent_threats(&self, n: usize) -> Vec<Verdict> {
        self.recent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_n(n)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Clear all accumulated state: dedup, breakers, correlation,
    /// enforcement, recent threats and counters. Registered guards and
    /// configuration stay.
    pub fn reset(&self) {
        self.dedup.clear();
        self.breakers.reset_all();
        self.correlation.reset();
        self.enforcement.reset();
        self.recent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.metrics.reset();
    }
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("guards", &self.registry.len())
            .field("bounds", &self.bounds)
            .finish()
    }
}
