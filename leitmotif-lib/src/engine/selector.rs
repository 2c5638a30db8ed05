//! Track selection with repetition avoidance and fallback.

use log::warn;
use rand::Rng;

use crate::engine::history::RecentlyPlayed;
use crate::rules::entry::EntryId;
use crate::rules::registry::EntryRegistry;

/// Pick a track for `entry_id`, preferring tracks not in the history.
///
/// Selection order:
/// 1. a uniformly random track of the entry not recently played;
/// 2. with `fallback_allowed`, the first sibling valid entry that still has
///    an unplayed track, in declaration order;
/// 3. a uniformly random track of the entry, repetition accepted.
///
/// The returned name is recorded into the history.
pub(crate) fn pick_track(
    entry_id: EntryId,
    registry: &EntryRegistry,
    valid: &[EntryId],
    history: &mut RecentlyPlayed,
) -> Option<String> {
    let entry = registry.get(entry_id)?;
    if entry.tracks.is_empty() {
        warn!("entry {} has no tracks to pick from", entry_id.index());
        return None;
    }

    let picked = pick_fresh(&entry.tracks, history)
        .or_else(|| {
            if !entry.fallback_allowed {
                return None;
            }
            valid
                .iter()
                .filter(|id| **id != entry_id)
                .filter_map(|id| registry.get(*id))
                .find_map(|sibling| pick_fresh(&sibling.tracks, history))
        })
        .unwrap_or_else(|| choose(&entry.tracks));

    history.record(&picked);
    Some(picked)
}

/// Uniform pick among the tracks absent from the history, if any.
fn pick_fresh(tracks: &[String], history: &RecentlyPlayed) -> Option<String> {
    let fresh: Vec<&String> = tracks
        .iter()
        .filter(|track| !history.contains(track))
        .collect();
    if fresh.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..fresh.len());
    Some(fresh[index].clone())
}

fn choose(tracks: &[String]) -> String {
    let index = rand::thread_rng().gen_range(0..tracks.len());
    tracks[index].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::entry::EntrySpec;
    use crate::signal::SignalRegistry;

    fn registry_with(entries: Vec<EntrySpec>) -> (EntryRegistry, Vec<EntryId>) {
        let signals = SignalRegistry::new();
        let mut registry = EntryRegistry::new();
        let ids = entries
            .into_iter()
            .map(|spec| registry.register(spec, &signals).unwrap())
            .collect();
        (registry, ids)
    }

    fn entry(tracks: &[&str], fallback_allowed: bool) -> EntrySpec {
        EntrySpec {
            rule_set: "test".to_string(),
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            fallback_allowed,
            ..EntrySpec::default()
        }
    }

    #[test]
    fn last_fresh_track_is_picked_deterministically() {
        let (registry, ids) = registry_with(vec![entry(&["a", "b", "c"], false)]);
        let mut history = RecentlyPlayed::new(8);
        history.record("a");
        history.record("c");

        let picked = pick_track(ids[0], &registry, &ids, &mut history).unwrap();
        assert_eq!(picked, "b");
        assert!(history.contains("b"));
    }

    #[test]
    fn fallback_borrows_from_the_first_fresh_sibling() {
        let (registry, ids) = registry_with(vec![
            entry(&["a"], true),
            entry(&["a"], false),
            entry(&["x"], false),
        ]);
        let mut history = RecentlyPlayed::new(8);
        history.record("a");

        let picked = pick_track(ids[0], &registry, &ids, &mut history).unwrap();
        assert_eq!(picked, "x");
    }

    #[test]
    fn without_fallback_repetition_is_accepted() {
        let (registry, ids) = registry_with(vec![entry(&["a", "b"], false)]);
        let mut history = RecentlyPlayed::new(8);
        history.record("a");
        history.record("b");

        let picked = pick_track(ids[0], &registry, &ids, &mut history).unwrap();
        assert!(picked == "a" || picked == "b");
    }

    #[test]
    fn exhausted_fallback_still_returns_from_own_list() {
        let (registry, ids) = registry_with(vec![entry(&["a"], true), entry(&["b"], false)]);
        let mut history = RecentlyPlayed::new(8);
        history.record("a");
        history.record("b");

        let picked = pick_track(ids[0], &registry, &ids, &mut history).unwrap();
        assert_eq!(picked, "a");
    }

    #[test]
    fn empty_track_list_yields_nothing() {
        let (registry, ids) = registry_with(vec![entry(&[], false)]);
        let mut history = RecentlyPlayed::new(8);
        assert!(pick_track(ids[0], &registry, &ids, &mut history).is_none());
    }

    #[test]
    fn both_fresh_tracks_appear_over_many_trials() {
        let (registry, ids) = registry_with(vec![entry(&["a", "b"], false)]);
        let mut saw_a = false;
        let mut saw_b = false;
        for _ in 0..200 {
            let mut history = RecentlyPlayed::new(8);
            match pick_track(ids[0], &registry, &ids, &mut history).unwrap().as_str() {
                "a" => saw_a = true,
                "b" => saw_b = true,
                other => panic!("unexpected pick {other}"),
            }
        }
        assert!(saw_a && saw_b);
    }
}
