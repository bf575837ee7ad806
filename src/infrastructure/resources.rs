//! Resource probe adapters.
//!
//! The engine does not measure CPU or memory itself; the host feeds
//! samples in through whatever monitoring it already runs. The shared
//! probe is the usual adapter: the host updates it periodically, the load
//! shedder reads the latest value.

use crate::application::ports::{ResourceProbe, ResourceSample};
use std::sync::{Arc, Mutex};

/// Probe fed by the host application.
///
/// Clone handles share the same sample; one side calls [`update`], the
/// load shedder calls [`sample`].
///
/// [`update`]: SharedResourceProbe::update
/// [`sample`]: ResourceProbe::sample
#[derive(Debug, Clone, Default)]
pub struct SharedResourceProbe {
    sample: Arc<Mutex<ResourceSample>>,
}

impl SharedResourceProbe {
    /// Create a probe reporting zero utilization until first updated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a fresh CPU/memory sample.
    pub fn update(&self, cpu_percent: f32, memory_percent: f32) {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner()) = ResourceSample {
            cpu_percent,
            memory_percent,
        };
    }
}

impl ResourceProbe for SharedResourceProbe {
    fn sample(&self) -> ResourceSample {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Probe that always reports an idle host; the default when none is given.
///
/// With this probe the load shedder never sheds.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleProbe;

impl ResourceProbe for IdleProbe {
    fn sample(&self) -> ResourceSample {
        ResourceSample::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_probe_reflects_updates() {
        let probe = SharedResourceProbe::new();
        assert_eq!(probe.sample(), ResourceSample::default());

        probe.update(75.5, 60.0);
        let sample = probe.sample();
        assert_eq!(sample.cpu_percent, 75.5);
        assert_eq!(sample.memory_percent, 60.0);
    }

    #[test]
    fn test_clones_share_the_sample() {
        let probe = SharedResourceProbe::new();
        let writer = probe.clone();
        writer.update(50.0, 50.0);
        assert_eq!(probe.sample().cpu_percent, 50.0);
    }

    #[test]
    fn test_idle_probe_reports_zero() {
        assert_eq!(IdleProbe.sample(), ResourceSample::default());
    }
}
