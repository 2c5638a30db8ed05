//! Condition model and matching.
//!
//! A condition is one AND-term of an entry: it holds several sub-lists
//! (signals, location tags, region tags, proximity thresholds) and is
//! satisfied when any recognized sub-list has at least one matching member.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::signal::{SignalId, SignalMap};

fn default_min_count() -> u32 {
    1
}

/// Proximity requirement: at least `min_count` of `key` nearby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximitySpec {
    pub key: String,
    #[serde(default = "default_min_count")]
    pub min_count: u32,
}

/// Loader-facing condition description. All references are by name; they
/// are interned into handles when the owning entry is registered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionSpec {
    pub signals: Vec<String>,
    pub location_tags: Vec<String>,
    pub region_tags: Vec<String>,
    pub proximity: Vec<ProximitySpec>,
}

/// Resolved condition holding interned signal handles.
#[derive(Debug, Clone)]
pub struct Condition {
    pub(crate) signals: Vec<SignalId>,
    pub(crate) location_tags: Vec<String>,
    pub(crate) region_tags: Vec<String>,
    pub(crate) proximity: Vec<(String, u32)>,
}

/// Borrowed snapshot of the world state conditions are matched against.
pub(crate) struct WorldView<'a> {
    pub signals: &'a SignalMap,
    pub location: &'a str,
    pub region: &'a str,
    pub proximity: &'a HashMap<String, u32>,
}

impl Condition {
    /// True if any recognized sub-list has at least one matching member.
    ///
    /// A condition whose sub-lists are all empty never matches.
    pub(crate) fn matches(&self, view: &WorldView<'_>) -> bool {
        if self.signals.iter().any(|id| view.signals.get(*id)) {
            return true;
        }
        if self
            .location_tags
            .iter()
            .any(|tag| view.location.contains(tag.as_str()))
        {
            return true;
        }
        if self
            .region_tags
            .iter()
            .any(|tag| view.region.contains(tag.as_str()))
        {
            return true;
        }
        self.proximity
            .iter()
            .any(|(key, min_count)| view.proximity.get(key).copied().unwrap_or(0) >= *min_count)
    }
}
