//! Inspection orchestration and resilience for HTTP payload screening.
//!
//! `payload-warden` runs a set of pluggable threat detectors ("guards")
//! against request payloads and keeps the host service healthy while doing
//! it. Detection logic lives entirely in the guards; this crate owns
//! everything around them:
//!
//! - **Admission sampling**: inspect a configurable fraction of traffic,
//!   with always-inspect overrides for sensitive IPs and routes.
//! - **Input bounding**: cap payload string length, nesting depth and
//!   element count before any guard sees the data.
//! - **Deduplication**: identical payloads within a TTL are answered from
//!   an LRU cache instead of re-running the pipeline.
//! - **Per-guard circuit breakers**: a repeatedly failing or hanging guard
//!   is taken out of rotation and probed back in gradually.
//! - **Load shedding**: under CPU or memory pressure, low-priority guard
//!   tiers are skipped; critical guards always run.
//! - **Execution strategies**: run all guards, stop at the first hit, or
//!   stop at a threat-level threshold, with per-guard deadlines and a total
//!   time budget.
//! - **Correlation and progressive enforcement**: repeated violations from
//!   one IP, user or session escalate through LOG, ALERT and BLOCK
//!   recommendations and raise threshold alerts.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use payload_warden::{
//!     Guard, GuardError, InspectionContext, ThreatLevel, Verdict, Warden,
//! };
//! use serde_json::{json, Value};
//!
//! struct SqlInjectionGuard;
//!
//! impl Guard for SqlInjectionGuard {
//!     fn name(&self) -> &str {
//!         "sqli"
//!     }
//!
//!     fn inspect(
//!         &self,
//!         input: &Value,
//!         _context: &InspectionContext,
//!     ) -> Result<Verdict, GuardError> {
//!         let text = input.to_string();
//!         if text.contains("' OR '1'='1") {
//!             Ok(Verdict::threat("sqli", ThreatLevel::High, "tautology probe"))
//!         } else {
//!             Ok(Verdict::pass("sqli"))
//!         }
//!     }
//! }
//!
//! let warden = Warden::builder()
//!     .register_guard(Arc::new(SqlInjectionGuard))
//!     .build()
//!     .unwrap();
//!
//! let context = InspectionContext::new().with_route("/login");
//! let result = warden.inspect(&json!({"user": "' OR '1'='1"}), &context);
//! assert!(result.threat_detected());
//! ```
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout. `domain` holds pure types
//! ([`Verdict`], [`InspectionContext`], fingerprinting, input bounding);
//! `application` holds the orchestrator and the stateful components wired
//! around the [`Guard`], [`Clock`], [`ResourceProbe`] and sink ports;
//! `infrastructure` holds the default adapters ([`SystemClock`],
//! [`TracingReporter`], [`SharedResourceProbe`]) and, behind the
//! `test-helpers` feature, mocks for all ports.
//!
//! All state is in-process and all maintenance is lazy on access; there are
//! no background threads apart from the per-invocation guard workers.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::admission::SamplingConfig;
pub use application::circuit_breaker::{CircuitBreakerConfig, CircuitState};
pub use application::correlation::CorrelationConfig;
pub use application::dedup::DedupConfig;
pub use application::enforcement::{EnforcementConfig, EnforcementLevel};
pub use application::load_shedder::{LoadShedderConfig, SystemHealth, Tier};
pub use application::metrics::MetricsSnapshot;
pub use application::orchestrator::{Warden, WardenBuilder, WardenConfig};
pub use application::pipeline::{PipelineConfig, PipelineStrategy};
pub use application::ports::{
    Clock, CorrelationAlert, CorrelationSink, Guard, GuardError, ReporterSink, ResourceProbe,
    ResourceSample,
};
pub use application::result::{PipelineResult, SkipReason, SkippedGuard};
pub use domain::bounding::InputBounds;
pub use domain::context::{IdentifierKind, InspectionContext};
pub use domain::fingerprint::InputFingerprint;
pub use domain::verdict::{ThreatLevel, Verdict};
pub use error::{ConfigError, InspectError};
pub use infrastructure::clock::SystemClock;
pub use infrastructure::resources::{IdleProbe, SharedResourceProbe};
pub use infrastructure::sinks::{LogCorrelationSink, TracingReporter};
