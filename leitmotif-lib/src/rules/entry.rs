//! Rule entries pairing conditions with candidate tracks.

use serde::{Deserialize, Serialize};

use crate::rules::condition::{Condition, ConditionSpec, WorldView};

/// Identifier of a registered entry. Ordering follows registration order,
/// which doubles as entry priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

impl EntryId {
    /// Position of the entry in registration order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Loader-facing entry description (names, not handles).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrySpec {
    /// Name of the rule set this entry belongs to.
    pub rule_set: String,
    /// Conditions that must all hold for the entry to be valid.
    pub conditions: Vec<ConditionSpec>,
    /// Candidate track names.
    pub tracks: Vec<String>,
    /// Whether the selector may borrow tracks from sibling valid entries.
    pub fallback_allowed: bool,
    /// Whether this entry drives the overlay player instead of the primary.
    pub overlay: bool,
    /// Queue a forced stop on the tick this entry becomes valid.
    pub force_stop_on_valid: bool,
    /// Queue a forced stop on the tick this entry becomes invalid.
    pub force_stop_on_invalid: bool,
    /// Queue a forced start on the tick this entry becomes valid.
    pub force_start_on_valid: bool,
    /// Probability in [0, 1] that a declared forced flag fires.
    pub force_chance: f64,
}

impl Default for EntrySpec {
    fn default() -> Self {
        Self {
            rule_set: String::new(),
            conditions: Vec::new(),
            tracks: Vec::new(),
            fallback_allowed: false,
            overlay: false,
            force_stop_on_valid: false,
            force_stop_on_invalid: false,
            force_start_on_valid: false,
            force_chance: 1.0,
        }
    }
}

/// Immutable, resolved rule entry held by the registry for the session.
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) rule_set: String,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) tracks: Vec<String>,
    pub(crate) fallback_allowed: bool,
    pub(crate) overlay: bool,
    pub(crate) force_stop_on_valid: bool,
    pub(crate) force_stop_on_invalid: bool,
    pub(crate) force_start_on_valid: bool,
    pub(crate) force_chance: f64,
}

impl Entry {
    /// Evaluate this entry against the current world state.
    ///
    /// Conditions combine with AND semantics. An entry with zero conditions
    /// fails closed.
    pub(crate) fn is_valid(&self, view: &WorldView<'_>) -> bool {
        !self.conditions.is_empty() && self.conditions.iter().all(|c| c.matches(view))
    }

    pub fn rule_set(&self) -> &str {
        &self.rule_set
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    pub fn is_overlay(&self) -> bool {
        self.overlay
    }
}
