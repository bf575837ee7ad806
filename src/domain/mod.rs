//! Domain layer - pure inspection concepts with no shared state.
//!
//! This layer contains the value types and pure algorithms of the inspection
//! engine:
//! - Verdicts and threat levels
//! - Per-request inspection context
//! - Input fingerprint computation
//! - Input bounding (byte, depth and element caps)
//!
//! All types in this layer are immutable or caller-owned and easily testable.

pub mod bounding;
pub mod context;
pub mod fingerprint;
pub mod verdict;
