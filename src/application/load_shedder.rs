//! Resource-aware load shedding.
//!
//! Guards are grouped into tiers; when host CPU or memory pressure exceeds
//! the configured thresholds, the lowest tiers are dropped first. The
//! critical tier is never shed.

use crate::application::ports::{Guard, ResourceProbe, ResourceSample};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Priority grouping of guards for load shedding.
///
/// The derived `Ord` follows declaration order, so
/// `Tier::Low < Tier::Medium < Tier::High < Tier::Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// First to be shed
    Low,
    /// Shed under sustained pressure
    Medium,
    /// Shed only under severe pressure
    High,
    /// Never shed
    Critical,
}

impl Tier {
    /// String name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Medium => "medium",
            Tier::High => "high",
            Tier::Critical => "critical",
        }
    }
}

/// Configuration for the load shedder.
#[derive(Debug, Clone)]
pub struct LoadShedderConfig {
    /// CPU percentage above which shedding starts
    pub cpu_threshold: f32,
    /// Memory percentage above which shedding starts
    pub memory_threshold: f32,
    /// Percentage points of overage per additional shed tier
    pub shed_step: f32,
    /// Tier membership by guard name
    pub tiers: HashMap<String, Tier>,
    /// Tier assigned to guards not listed in `tiers`
    pub default_tier: Tier,
}

impl Default for LoadShedderConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 85.0,
            memory_threshold: 90.0,
            shed_step: 5.0,
            tiers: HashMap::new(),
            default_tier: Tier::Medium,
        }
    }
}

impl LoadShedderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for threshold in [self.cpu_threshold, self.memory_threshold] {
            if !(threshold > 0.0 && threshold <= 100.0) {
                return Err(ConfigError::InvalidResourceThreshold(threshold));
            }
        }
        if !(self.shed_step > 0.0) {
            return Err(ConfigError::InvalidResourceThreshold(self.shed_step));
        }
        Ok(())
    }
}

/// Snapshot of host health as seen by the shedder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemHealth {
    /// Last sampled CPU percentage
    pub cpu_percent: f32,
    /// Last sampled memory percentage
    pub memory_percent: f32,
    /// Lowest tier currently allowed to run
    pub active_tier: Tier,
}

/// Drops low-priority guards when the host is under pressure.
#[derive(Debug)]
pub struct LoadShedder {
    config: LoadShedderConfig,
    probe: Arc<dyn ResourceProbe>,
    last_sample: Mutex<ResourceSample>,
}

impl LoadShedder {
    /// Create a shedder polling the given probe.
    pub fn new(config: LoadShedderConfig, probe: Arc<dyn ResourceProbe>) -> Self {
        Self {
            config,
            probe,
            last_sample: Mutex::new(ResourceSample::default()),
        }
    }

    /// Tier a guard belongs to.
    pub fn tier_of(&self, guard: &str) -> Tier {
        self.config
            .tiers
            .get(guard)
            .copied()
            .unwrap_or(self.config.default_tier)
    }

    /// Partition guards into (kept, shed names) under current load.
    ///
    /// Takes a fresh resource sample; at full health all guards are kept.
    pub fn filter_guards(
        &self,
        guards: &[Arc<dyn Guard>],
    ) -> (Vec<Arc<dyn Guard>>, Vec<String>) {
        let sample = self.probe.sample();
        *self.lock() = sample;

        let floor = self.active_tier(sample);
        if floor == Tier::Low {
            return (guards.to_vec(), Vec::new());
        }

        let mut kept = Vec::with_capacity(guards.len());
        let mut shed = Vec::new();
        for guard in guards {
            if self.tier_of(guard.name()) >= floor {
                kept.push(guard.clone());
            } else {
                shed.push(guard.name().to_string());
            }
        }
        if !shed.is_empty() {
            debug!(
                cpu = sample.cpu_percent,
                memory = sample.memory_percent,
                floor = floor.as_str(),
                shed = shed.len(),
                "shedding low-priority guards under load"
            );
        }
        (kept, shed)
    }

    /// Current health snapshot, based on the most recent sample.
    pub fn system_health(&self) -> SystemHealth {
        let sample = *self.lock();
        SystemHealth {
            cpu_percent: sample.cpu_percent,
            memory_percent: sample.memory_percent,
            active_tier: self.active_tier(sample),
        }
    }

    /// Lowest tier allowed to run for a sample.
    ///
    /// Shedding escalates one tier per `shed_step` percentage points of
    /// overage past whichever threshold is exceeded the most; the critical
    /// tier always survives.
    fn active_tier(&self, sample: ResourceSample) -> Tier {
        let overage = f32::max(
            sample.cpu_percent - self.config.cpu_threshold,
            sample.memory_percent - self.config.memory_threshold,
        );
        if overage < 0.0 {
            Tier::Low
        } else if overage < self.config.shed_step {
            Tier::Medium
        } else if overage < 2.0 * self.config.shed_step {
            Tier::High
        } else {
            Tier::Critical
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ResourceSample> {
        self.last_sample.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::GuardError;
    use crate::domain::context::InspectionContext;
    use crate::domain::verdict::Verdict;
    use crate::infrastructure::mocks::MockProbe;
    use serde_json::Value;

    struct NamedGuard(&'static str);

    impl Guard for NamedGuard {
        fn name(&self) -> &str {
            self.0
        }
        fn inspect(
            &self,
            _input: &Value,
            _context: &InspectionContext,
        ) -> Result<Verdict, GuardError> {
            Ok(Verdict::pass(self.0))
        }
    }

    fn shedder(probe: Arc<MockProbe>) -> LoadShedder {
        let mut tiers = HashMap::new();
        tiers.insert("auth".to_string(), Tier::Critical);
        tiers.insert("sqli".to_string(), Tier::High);
        tiers.insert("xss".to_string(), Tier::Medium);
        tiers.insert("heuristics".to_string(), Tier::Low);
        LoadShedder::new(
            LoadShedderConfig {
                cpu_threshold: 80.0,
                memory_threshold: 90.0,
                shed_step: 5.0,
                tiers,
                default_tier: Tier::Medium,
            },
            probe,
        )
    }

    fn guards() -> Vec<Arc<dyn Guard>> {
        vec![
            Arc::new(NamedGuard("auth")),
            Arc::new(NamedGuard("sqli")),
            Arc::new(NamedGuard("xss")),
            Arc::new(NamedGuard("heuristics")),
        ]
    }

    #[test]
    fn test_full_health_keeps_all_tiers() {
        let probe = Arc::new(MockProbe::new(40.0, 50.0));
        let s = shedder(probe);
        let (kept, shed) = s.filter_guards(&guards());
        assert_eq!(kept.len(), 4);
        assert!(shed.is_empty());
        assert_eq!(s.system_health().active_tier, Tier::Low);
    }

    #[test]
    fn test_mild_pressure_drops_low_tier() {
        let probe = Arc::new(MockProbe::new(82.0, 50.0));
        let s = shedder(probe);
        let (kept, shed) = s.filter_guards(&guards());
        let kept: Vec<_> = kept.iter().map(|g| g.name().to_string()).collect();
        assert_eq!(kept, vec!["auth", "sqli", "xss"]);
        assert_eq!(shed, vec!["heuristics"]);
    }

    #[test]
    fn test_sustained_pressure_drops_medium_tier() {
        let probe = Arc::new(MockProbe::new(87.0, 50.0));
        let s = shedder(probe);
        let (kept, _shed) = s.filter_guards(&guards());
        let kept: Vec<_> = kept.iter().map(|g| g.name().to_string()).collect();
        assert_eq!(kept, vec!["auth", "sqli"]);
        assert_eq!(s.system_health().active_tier, Tier::High);
    }

    #[test]
    fn test_severe_pressure_keeps_only_critical() {
        let probe = Arc::new(MockProbe::new(99.0, 50.0));
        let s = shedder(probe);
        let (kept, shed) = s.filter_guards(&guards());
        let kept: Vec<_> = kept.iter().map(|g| g.name().to_string()).collect();
        assert_eq!(kept, vec!["auth"], "critical tier is never shed");
        assert_eq!(shed.len(), 3);
    }

    #[test]
    fn test_memory_threshold_also_triggers() {
        let probe = Arc::new(MockProbe::new(10.0, 93.0));
        let s = shedder(probe);
        let (kept, _) = s.filter_guards(&guards());
        assert_eq!(kept.len(), 3, "memory overage sheds the low tier");
    }

    #[test]
    fn test_unlisted_guard_uses_default_tier() {
        let probe = Arc::new(MockProbe::new(82.0, 50.0));
        let s = shedder(probe);
        let extra: Vec<Arc<dyn Guard>> = vec![Arc::new(NamedGuard("unlisted"))];
        let (kept, _) = s.filter_guards(&extra);
        assert_eq!(kept.len(), 1, "default tier is medium, kept at floor medium");
    }

    #[test]
    fn test_health_reflects_last_sample() {
        let probe = Arc::new(MockProbe::new(30.0, 40.0));
        let s = shedder(probe.clone());
        s.filter_guards(&guards());
        probe.set(95.0, 40.0);
        // Health still reports the last sample taken by filter_guards.
        assert_eq!(s.system_health().cpu_percent, 30.0);
        s.filter_guards(&guards());
        assert_eq!(s.system_health().cpu_percent, 95.0);
    }

    #[test]
    fn test_config_validation() {
        let bad = LoadShedderConfig {
            cpu_threshold: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = LoadShedderConfig {
            memory_threshold: 101.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        assert!(LoadShedderConfig::default().validate().is_ok());
    }
}
