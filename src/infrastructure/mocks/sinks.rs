//! Capturing sinks.

use crate::application::ports::{CorrelationAlert, CorrelationSink, ReporterSink};
use crate::domain::context::InspectionContext;
use crate::domain::verdict::Verdict;
use std::sync::Mutex;

/// Reporter sink that records every verdict it receives.
#[derive(Debug, Default)]
pub struct CaptureReporter {
    reports: Mutex<Vec<Verdict>>,
}

impl CaptureReporter {
    /// Create an empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All verdicts received so far.
    pub fn reports(&self) -> Vec<Verdict> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ReporterSink for CaptureReporter {
    fn report(&self, verdict: &Verdict, _context: &InspectionContext) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(verdict.clone());
    }
}

/// Correlation sink that records every alert it receives.
#[derive(Debug, Default)]
pub struct CaptureCorrelationSink {
    alerts: Mutex<Vec<CorrelationAlert>>,
}

impl CaptureCorrelationSink {
    /// Create an empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts received so far.
    pub fn alerts(&self) -> Vec<CorrelationAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CorrelationSink for CaptureCorrelationSink {
    fn threshold_exceeded(&self, alert: &CorrelationAlert) {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
    }
}
