//! Guard test doubles.

use crate::application::ports::{Guard, GuardError};
use crate::domain::context::InspectionContext;
use crate::domain::verdict::{ThreatLevel, Verdict};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a [`ScriptedGuard`] does on one invocation.
#[derive(Debug, Clone)]
pub enum GuardBehavior {
    /// Return a passing verdict
    Pass,
    /// Return a failing verdict at the given level
    Threat(ThreatLevel),
    /// Return a guard error
    Fail,
    /// Panic inside `inspect`
    Panic,
    /// Sleep for the duration, then pass
    Sleep(Duration),
}

/// Guard that plays back a scripted behavior sequence.
///
/// The last behavior repeats once the script runs out. Invocations are
/// counted so tests can assert how often the pipeline actually called in.
pub struct ScriptedGuard {
    name: &'static str,
    priority: i32,
    quick: bool,
    script: Mutex<VecDeque<GuardBehavior>>,
    fallback: GuardBehavior,
    calls: AtomicUsize,
}

impl ScriptedGuard {
    /// Create a guard playing back `script`.
    pub fn new(name: &'static str, script: Vec<GuardBehavior>) -> Self {
        let fallback = script.last().cloned().unwrap_or(GuardBehavior::Pass);
        Self {
            name,
            priority: 0,
            quick: false,
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the guard's priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Flag the guard for the quick-scan pass.
    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }

    /// Number of times `inspect` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Guard for ScriptedGuard {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn quick_scan(&self) -> bool {
        self.quick
    }

    fn inspect(&self, _input: &Value, _context: &InspectionContext) -> Result<Verdict, GuardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match behavior {
            GuardBehavior::Pass => Ok(Verdict::pass(self.name)),
            GuardBehavior::Threat(level) => Ok(Verdict::threat(self.name, level, "scripted threat")),
            GuardBehavior::Fail => Err(GuardError::new("scripted failure")),
            GuardBehavior::Panic => panic!("scripted panic in guard {}", self.name),
            GuardBehavior::Sleep(duration) => {
                std::thread::sleep(duration);
                Ok(Verdict::pass(self.name))
            }
        }
    }
}

/// Guard that always returns the same verdict.
pub struct StaticGuard {
    name: &'static str,
    priority: i32,
    enabled: bool,
    quick: bool,
    level: ThreatLevel,
}

impl StaticGuard {
    /// Guard that always passes.
    pub fn passing(name: &'static str) -> Self {
        Self {
            name,
            priority: 0,
            enabled: true,
            quick: false,
            level: ThreatLevel::None,
        }
    }

    /// Guard that always reports a threat at `level`.
    pub fn threat(name: &'static str, level: ThreatLevel) -> Self {
        Self {
            level,
            ..Self::passing(name)
        }
    }

    /// Set the guard's priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the guard disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Flag the guard for the quick-scan pass.
    pub fn quick(mut self) -> Self {
        self.quick = true;
        self
    }
}

impl Guard for StaticGuard {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn quick_scan(&self) -> bool {
        self.quick
    }

    fn inspect(&self, _input: &Value, _context: &InspectionContext) -> Result<Verdict, GuardError> {
        if self.level == ThreatLevel::None {
            Ok(Verdict::pass(self.name))
        } else {
            Ok(Verdict::threat(self.name, self.level, "static threat"))
        }
    }
}
