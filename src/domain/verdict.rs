//! Guard verdicts and threat severity levels.
//!
//! A [`Verdict`] is the immutable outcome of one guard invocation. Once
//! constructed it is never mutated, so it can be shared by value or by
//! read-only reference across threads without synchronization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a detected threat, ordered from benign to critical.
///
/// The derived `Ord` follows declaration order, so
/// `ThreatLevel::None < ThreatLevel::Low < ... < ThreatLevel::Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    /// No threat detected
    #[default]
    None,
    /// Low-confidence or low-impact finding
    Low,
    /// Suspicious but not conclusive
    Medium,
    /// Likely attack
    High,
    /// Confirmed or high-impact attack
    Critical,
}

impl ThreatLevel {
    /// Ordinal weight of this level, useful for scoring and aggregation.
    pub fn weight(&self) -> u8 {
        *self as u8
    }

    /// String name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "NONE",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable outcome of a single guard invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Name of the guard that produced this verdict
    pub guard: String,
    /// Whether the input passed inspection (no threat)
    pub passed: bool,
    /// Severity of the detected threat (`None` when passed)
    pub level: ThreatLevel,
    /// Human-readable description of the finding
    pub message: String,
    /// Free-form structured details supplied by the guard
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Verdict {
    /// Create a passing verdict (no threat found).
    pub fn pass(guard: impl Into<String>) -> Self {
        Self {
            guard: guard.into(),
            passed: true,
            level: ThreatLevel::None,
            message: String::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a failing verdict describing a detected threat.
    pub fn threat(guard: impl Into<String>, level: ThreatLevel, message: impl Into<String>) -> Self {
        Self {
            guard: guard.into(),
            passed: false,
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry. Intended for use during construction only;
    /// a verdict handed to the engine is treated as immutable.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether this verdict represents a detected threat.
    pub fn is_threat(&self) -> bool {
        !self.passed
    }
}
