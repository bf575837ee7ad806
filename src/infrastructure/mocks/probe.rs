//! Resource probe with settable readings.

use crate::application::ports::{ResourceProbe, ResourceSample};
use std::sync::Mutex;

/// Probe whose readings the test sets directly.
#[derive(Debug)]
pub struct MockProbe {
    sample: Mutex<ResourceSample>,
}

impl MockProbe {
    /// Create a probe reporting the given utilization.
    pub fn new(cpu_percent: f32, memory_percent: f32) -> Self {
        Self {
            sample: Mutex::new(ResourceSample {
                cpu_percent,
                memory_percent,
            }),
        }
    }

    /// Change the reported utilization.
    pub fn set(&self, cpu_percent: f32, memory_percent: f32) {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner()) = ResourceSample {
            cpu_percent,
            memory_percent,
        };
    }
}

impl ResourceProbe for MockProbe {
    fn sample(&self) -> ResourceSample {
        *self.sample.lock().unwrap_or_else(|e| e.into_inner())
    }
}
