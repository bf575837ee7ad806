//! Test doubles for the engine's ports.
//!
//! Available to this crate's tests and, behind the `test-helpers` feature,
//! to downstream integration tests.

mod clock;
mod guards;
mod probe;
mod sinks;

pub use clock::MockClock;
pub use guards::{GuardBehavior, ScriptedGuard, StaticGuard};
pub use probe::MockProbe;
pub use sinks::{CaptureCorrelationSink, CaptureReporter};
