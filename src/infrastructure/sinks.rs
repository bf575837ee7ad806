//! Default reporter and correlation sinks.

use crate::application::ports::{CorrelationAlert, CorrelationSink, ReporterSink};
use crate::domain::context::InspectionContext;
use crate::domain::verdict::Verdict;
use tracing::warn;

/// Reporter sink that emits failing verdicts as structured log events.
///
/// The default when no external reporting backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ReporterSink for TracingReporter {
    fn report(&self, verdict: &Verdict, context: &InspectionContext) {
        warn!(
            guard = %verdict.guard,
            level = verdict.level.as_str(),
            message = %verdict.message,
            ip = ?context.ip,
            route = context.route.as_deref().unwrap_or("-"),
            "threat detected"
        );
    }
}

/// Correlation sink that logs threshold-exceeded events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCorrelationSink;

impl CorrelationSink for LogCorrelationSink {
    fn threshold_exceeded(&self, alert: &CorrelationAlert) {
        warn!(
            kind = alert.kind.as_str(),
            identifier = %alert.identifier,
            count = alert.count,
            window_secs = alert.window.as_secs(),
            "repeated violations from one source"
        );
    }
}
