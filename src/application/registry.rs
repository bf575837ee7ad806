//! Ordered guard registry.
//!
//! Guards are registered explicitly at startup; there is no ambient global
//! registry. The collection keeps descending priority order so the pipeline
//! can iterate it directly.

use crate::application::ports::Guard;
use crate::error::ConfigError;
use std::sync::Arc;

/// Ordered collection of registered guards.
///
/// Names are unique; insertion keeps the list sorted by descending priority
/// (ties keep registration order).
#[derive(Default, Clone)]
pub struct GuardRegistry {
    guards: Vec<Arc<dyn Guard>>,
}

impl GuardRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a guard.
    ///
    /// # Errors
    /// Returns [`ConfigError::DuplicateGuard`] if a guard with the same name
    /// is already registered.
    pub fn register(&mut self, guard: Arc<dyn Guard>) -> Result<(), ConfigError> {
        if self.guards.iter().any(|g| g.name() == guard.name()) {
            return Err(ConfigError::DuplicateGuard(guard.name().to_string()));
        }
        // Stable insertion point: after all guards with priority >= new one.
        let pos = self
            .guards
            .iter()
            .position(|g| g.priority() < guard.priority())
            .unwrap_or(self.guards.len());
        self.guards.insert(pos, guard);
        Ok(())
    }

    /// All guards in descending priority order.
    pub fn guards(&self) -> &[Arc<dyn Guard>] {
        &self.guards
    }

    /// Look up a guard by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Guard>> {
        self.guards.iter().find(|g| g.name() == name)
    }

    /// The subset of guards with the given names, priority order preserved.
    ///
    /// Unknown names are ignored.
    pub fn subset(&self, names: &[&str]) -> Vec<Arc<dyn Guard>> {
        self.guards
            .iter()
            .filter(|g| names.contains(&g.name()))
            .cloned()
            .collect()
    }

    /// Number of registered guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl std::fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRegistry")
            .field(
                "guards",
                &self.guards.iter().map(|g| g.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
