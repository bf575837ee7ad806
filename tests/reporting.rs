//! Log output of the default sinks, captured through a test subscriber.

use payload_warden::infrastructure::mocks::StaticGuard;
use payload_warden::{
    CorrelationAlert, CorrelationSink, IdentifierKind, InspectionContext, LogCorrelationSink,
    ReporterSink, ThreatLevel, TracingReporter, Verdict, Warden,
};
use serde_json::json;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Shared in-memory writer the fmt subscriber drains into.
#[derive(Clone, Default)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl CaptureWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` under a capturing subscriber and return everything it logged.
///
/// The sinks emit on the caller's thread, so a thread-local default
/// subscriber sees every event.
fn capture_logs(f: impl FnOnce()) -> String {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    writer.contents()
}

#[test]
fn tracing_reporter_emits_the_failing_verdict() {
    let output = capture_logs(|| {
        let verdict = Verdict::threat("sqli", ThreatLevel::High, "tautology in query");
        let context = InspectionContext::new()
            .with_ip(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)))
            .with_route("/login");
        TracingReporter.report(&verdict, &context);
    });

    assert!(output.contains("threat detected"), "captured: {output}");
    assert!(output.contains("sqli"));
    assert!(output.contains("HIGH"));
    assert!(output.contains("/login"));
    assert!(output.contains("203.0.113.7"));
}

#[test]
fn correlation_sink_emits_the_threshold_crossing() {
    let output = capture_logs(|| {
        LogCorrelationSink.threshold_exceeded(&CorrelationAlert {
            kind: IdentifierKind::User,
            identifier: "mallory".to_string(),
            count: 5,
            window: Duration::from_secs(60),
        });
    });

    assert!(
        output.contains("repeated violations from one source"),
        "captured: {output}"
    );
    assert!(output.contains("user"));
    assert!(output.contains("mallory"));
    assert!(output.contains("count=5"));
}

#[test]
fn default_reporter_emits_during_a_full_inspection() {
    // A warden built without an explicit reporter keeps the tracing one.
    let warden = Warden::builder()
        .register_guard(Arc::new(StaticGuard::threat("xss", ThreatLevel::Medium)))
        .build()
        .unwrap();

    let output = capture_logs(|| {
        let context = InspectionContext::new().with_route("/comments");
        let result = warden.inspect(&json!({"body": "<script>"}), &context);
        assert!(result.threat_detected());
    });

    assert!(output.contains("threat detected"), "captured: {output}");
    assert!(output.contains("xss"));
    assert!(output.contains("MEDIUM"));
    assert!(output.contains("/comments"));
}
