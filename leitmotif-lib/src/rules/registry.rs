//! Entry registration and per-tick validity resolution.

use crate::error::EngineError;
use crate::rules::condition::{Condition, WorldView};
use crate::rules::entry::{Entry, EntryId, EntrySpec};
use crate::signal::SignalRegistry;

/// Holds every loaded rule entry in registration order.
#[derive(Debug, Default)]
pub struct EntryRegistry {
    entries: Vec<Entry>,
}

impl EntryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a spec against the declared signals and store the entry.
    ///
    /// Signal names the providers never declared are a registration error;
    /// they must not surface as silent tick-time misses.
    pub fn register(
        &mut self,
        spec: EntrySpec,
        signals: &SignalRegistry,
    ) -> Result<EntryId, EngineError> {
        let mut conditions = Vec::with_capacity(spec.conditions.len());
        for condition in spec.conditions {
            let mut resolved = Vec::with_capacity(condition.signals.len());
            for name in &condition.signals {
                match signals.lookup(name) {
                    Some(id) => resolved.push(id),
                    None => return Err(EngineError::UnknownSignal(name.clone())),
                }
            }
            conditions.push(Condition {
                signals: resolved,
                location_tags: condition.location_tags,
                region_tags: condition.region_tags,
                proximity: condition
                    .proximity
                    .into_iter()
                    .map(|p| (p.key, p.min_count))
                    .collect(),
            });
        }

        let id = EntryId(self.entries.len());
        self.entries.push(Entry {
            rule_set: spec.rule_set,
            conditions,
            tracks: spec.tracks,
            fallback_allowed: spec.fallback_allowed,
            overlay: spec.overlay,
            force_stop_on_valid: spec.force_stop_on_valid,
            force_stop_on_invalid: spec.force_stop_on_invalid,
            force_start_on_valid: spec.force_start_on_valid,
            force_chance: spec.force_chance.clamp(0.0, 1.0),
        });
        Ok(id)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every entry against the world, in registration order.
    ///
    /// No caching across ticks; signals can change every tick.
    pub(crate) fn valid_entries(&self, view: &WorldView<'_>) -> Vec<EntryId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_valid(view))
            .map(|(index, _)| EntryId(index))
            .collect()
    }
}
