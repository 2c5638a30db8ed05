//! Signal interning and the per-tick boolean signal table.
//!
//! Providers declare signals once and hold on to the returned [`SignalId`];
//! all tick-time lookups are dense index reads, never string compares.

use std::collections::HashMap;

/// Opaque handle for a registered signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(pub(crate) usize);

/// Registry mapping signal names to dense handles.
#[derive(Debug, Default)]
pub struct SignalRegistry {
    names: Vec<String>,
    by_name: HashMap<String, SignalId>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a signal, returning its handle. Registering the same name
    /// twice returns the original handle.
    pub fn register(&mut self, name: &str) -> SignalId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = SignalId(self.names.len());
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Resolve a declared signal name to its handle.
    pub fn lookup(&self, name: &str) -> Option<SignalId> {
        self.by_name.get(name).copied()
    }

    /// Name of a registered signal, for diagnostics.
    pub fn name(&self, id: SignalId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Boolean signal values for the current tick.
///
/// Values default to `false` and persist across ticks until a provider
/// overwrites them; signals are never removed during a session.
#[derive(Debug, Default)]
pub struct SignalMap {
    values: Vec<bool>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the table so every registered signal has a slot.
    pub fn resize_for(&mut self, registry: &SignalRegistry) {
        if self.values.len() < registry.len() {
            self.values.resize(registry.len(), false);
        }
    }

    pub fn set(&mut self, id: SignalId, value: bool) {
        if let Some(slot) = self.values.get_mut(id.0) {
            *slot = value;
        }
    }

    pub fn get(&self, id: SignalId) -> bool {
        self.values.get(id.0).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut registry = SignalRegistry::new();
        let first = registry.register("NIGHT");
        let second = registry.register("NIGHT");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_misses_are_none() {
        let registry = SignalRegistry::new();
        assert!(registry.lookup("COMBAT").is_none());
    }

    #[test]
    fn values_default_to_false_and_persist() {
        let mut registry = SignalRegistry::new();
        let night = registry.register("NIGHT");
        let combat = registry.register("COMBAT");

        let mut map = SignalMap::new();
        map.resize_for(&registry);
        assert!(!map.get(night));

        map.set(night, true);
        assert!(map.get(night));
        assert!(!map.get(combat));
    }
}
