//! Infrastructure adapters: clocks, probes, sinks and storage primitives.

pub mod clock;
pub mod resources;
pub mod ring_buffer;
pub mod sinks;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
