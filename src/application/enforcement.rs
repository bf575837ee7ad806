//! Progressive per-identifier enforcement.
//!
//! Repeated violations inside a sliding window escalate an identifier
//! through LOG, ALERT and BLOCK. The level never steps down while
//! violations keep arriving; only a quiet period of `cooldown` since the
//! last violation resets the identifier to NONE and clears its history.
//! Output is advisory; the host decides what blocking means.

use crate::application::ports::Clock;
use crate::error::ConfigError;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Recommended action for an identifier.
///
/// Derived `Ord` follows declaration order, so
/// `None < Log < Alert < Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnforcementLevel {
    /// No action
    #[default]
    None,
    /// Record the violation
    Log,
    /// Notify an operator
    Alert,
    /// Recommend rejecting further requests
    Block,
}

impl EnforcementLevel {
    /// String name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementLevel::None => "NONE",
            EnforcementLevel::Log => "LOG",
            EnforcementLevel::Alert => "ALERT",
            EnforcementLevel::Block => "BLOCK",
        }
    }
}

/// Configuration for progressive enforcement.
#[derive(Debug, Clone)]
pub struct EnforcementConfig {
    /// Violations within the window to reach LOG
    pub log_threshold: usize,
    /// Violations within the window to reach ALERT
    pub alert_threshold: usize,
    /// Violations within the window to reach BLOCK
    pub block_threshold: usize,
    /// Sliding window length
    pub window: Duration,
    /// Quiet period after which an identifier resets to NONE
    pub cooldown: Duration,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            log_threshold: 1,
            alert_threshold: 5,
            block_threshold: 10,
            window: Duration::from_secs(300),
            cooldown: Duration::from_secs(600),
        }
    }
}

impl EnforcementConfig {
    /// Validate that thresholds satisfy `0 < log < alert < block`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_threshold == 0
            || self.log_threshold >= self.alert_threshold
            || self.alert_threshold >= self.block_threshold
        {
            return Err(ConfigError::EnforcementOrdering {
                log: self.log_threshold,
                alert: self.alert_threshold,
                block: self.block_threshold,
            });
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow("enforcement window"));
        }
        if self.cooldown.is_zero() {
            return Err(ConfigError::ZeroWindow("enforcement cooldown"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct EnforcementState {
    timestamps: VecDeque<Instant>,
    level: EnforcementLevel,
    last_violation: Instant,
}

/// Tracks violation history and escalation level per identifier.
///
/// Cooldown and window pruning are lazy, applied whenever an identifier is
/// observed. There are no background sweeps; an identifier nobody asks about
/// simply keeps its stale state until touched.
pub struct EnforcementTracker {
    states: DashMap<String, EnforcementState, ahash::RandomState>,
    config: EnforcementConfig,
    clock: Arc<dyn Clock>,
}

impl EnforcementTracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: EnforcementConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            states: DashMap::with_hasher(ahash::RandomState::new()),
            config,
            clock,
        }
    }

    /// Record one violation and return the identifier's (possibly escalated)
    /// level.
    pub fn record_violation(&self, identifier: &str) -> EnforcementLevel {
        let now = self.clock.now();
        let mut state = self
            .states
            .entry(identifier.to_string())
            .or_insert_with(|| EnforcementState {
                timestamps: VecDeque::new(),
                level: EnforcementLevel::None,
                last_violation: now,
            });

        if self.cooled_down(&state, now) {
            state.timestamps.clear();
            state.level = EnforcementLevel::None;
            debug!(identifier = %identifier, "enforcement state reset after cooldown");
        }

        self.prune(&mut state, now);
        state.timestamps.push_back(now);
        state.last_violation = now;

        let computed = self.level_for(state.timestamps.len());
        // Monotonic within a live window: escalate, never de-escalate.
        if computed > state.level {
            state.level = computed;
            warn!(
                identifier = %identifier,
                level = state.level.as_str(),
                violations = state.timestamps.len(),
                "enforcement level escalated"
            );
        }
        state.level
    }

    /// Current level for an identifier, without recording anything.
    ///
    /// Honors cooldown: a cooled-down identifier reports NONE.
    pub fn level(&self, identifier: &str) -> EnforcementLevel {
        let now = self.clock.now();
        match self.states.get(identifier) {
            Some(state) if !self.cooled_down(&state, now) => state.level,
            _ => EnforcementLevel::None,
        }
    }

    /// Drop all tracked identifiers.
    pub fn reset(&self) {
        self.states.clear();
    }

    fn cooled_down(&self, state: &EnforcementState, now: Instant) -> bool {
        now.saturating_duration_since(state.last_violation) >= self.config.cooldown
    }

    fn prune(&self, state: &mut EnforcementState, now: Instant) {
        while let Some(&oldest) = state.timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.config.window {
                state.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn level_for(&self, count: usize) -> EnforcementLevel {
        if count >= self.config.block_threshold {
            EnforcementLevel::Block
        } else if count >= self.config.alert_threshold {
            EnforcementLevel::Alert
        } else if count >= self.config.log_threshold {
            EnforcementLevel::Log
        } else {
            EnforcementLevel::None
        }
    }
}

impl std::fmt::Debug for EnforcementTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementTracker")
            .field("config", &self.config)
            .field("tracked", &self.states.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;

    fn tracker(
        log: usize,
        alert: usize,
        block: usize,
        window_secs: u64,
        cooldown_secs: u64,
    ) -> (EnforcementTracker, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let t = EnforcementTracker::new(
            EnforcementConfig {
                log_threshold: log,
                alert_threshold: alert,
                block_threshold: block,
                window: Duration::from_secs(window_secs),
                cooldown: Duration::from_secs(cooldown_secs),
            },
            clock.clone(),
        );
        (t, clock)
    }

    #[test]
    fn test_escalation_through_all_levels() {
        // Thresholds {1, 3, 5}: violations 1..=5 walk LOG, LOG, ALERT,
        // ALERT, BLOCK.
        let (t, _clock) = tracker(1, 3, 5, 300, 600);
        let expected = [
            EnforcementLevel::Log,
            EnforcementLevel::Log,
            EnforcementLevel::Alert,
            EnforcementLevel::Alert,
            EnforcementLevel::Block,
        ];
        for want in expected {
            assert_eq!(t.record_violation("10.0.0.1"), want);
        }
    }

    #[test]
    fn test_level_is_monotonic_within_window() {
        let (t, clock) = tracker(1, 3, 5, 10, 600);
        for _ in 0..3 {
            t.record_violation("u1");
        }
        assert_eq!(t.level("u1"), EnforcementLevel::Alert);

        // Window rolls violations off, but the level holds while new
        // violations keep the identifier warm.
        clock.advance(Duration::from_secs(11));
        assert_eq!(t.record_violation("u1"), EnforcementLevel::Alert);
    }

    #[test]
    fn test_cooldown_resets_to_none() {
        let (t, clock) = tracker(1, 3, 5, 300, 60);
        for _ in 0..5 {
            t.record_violation("10.0.0.1");
        }
        assert_eq!(t.level("10.0.0.1"), EnforcementLevel::Block);

        clock.advance(Duration::from_secs(61));
        assert_eq!(t.level("10.0.0.1"), EnforcementLevel::None);

        // Next violation starts a fresh history.
        assert_eq!(t.record_violation("10.0.0.1"), EnforcementLevel::Log);
    }

    #[test]
    fn test_violation_within_cooldown_restarts_it() {
        let (t, clock) = tracker(1, 3, 5, 300, 60);
        t.record_violation("s1");
        clock.advance(Duration::from_secs(50));
        t.record_violation("s1");
        clock.advance(Duration::from_secs(50));
        // 100s since the first violation, 50s since the last: still warm.
        assert_eq!(t.level("s1"), EnforcementLevel::Log);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (t, _clock) = tracker(1, 3, 5, 300, 600);
        for _ in 0..5 {
            t.record_violation("bad");
        }
        t.record_violation("mild");
        assert_eq!(t.level("bad"), EnforcementLevel::Block);
        assert_eq!(t.level("mild"), EnforcementLevel::Log);
        assert_eq!(t.level("unseen"), EnforcementLevel::None);
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        for (log, alert, block) in [(0, 3, 5), (3, 3, 5), (1, 5, 5), (5, 3, 1)] {
            let config = EnforcementConfig {
                log_threshold: log,
                alert_threshold: alert,
                block_threshold: block,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{log} {alert} {block}");
        }
        assert!(EnforcementConfig::default().validate().is_ok());
    }

    #[test]
    fn test_level_ordering() {
        assert!(EnforcementLevel::None < EnforcementLevel::Log);
        assert!(EnforcementLevel::Log < EnforcementLevel::Alert);
        assert!(EnforcementLevel::Alert < EnforcementLevel::Block);
    }
}
