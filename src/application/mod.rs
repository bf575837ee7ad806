//! Application layer: orchestration and the stateful resilience components.
//!
//! Everything here is driven through [`orchestrator::Warden`]; the
//! individual components are public so hosts can introspect or reuse them,
//! but the orchestrator owns the per-request flow.

pub mod admission;
pub mod circuit_breaker;
pub mod correlation;
pub mod dedup;
pub mod enforcement;
pub mod executor;
pub mod load_shedder;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod registry;
pub mod result;
