//! Engine scheduler: owns all mutable state and drives the tick pipeline.
//!
//! Within one tick the ordering is fixed: signal updates happen before
//! entry resolution, which happens before the transition machine (or the
//! overlay coordinator), which happens before fade integration. Everything
//! runs on the caller's thread; only player workers block.

pub mod history;
mod overlay;
mod selector;
mod transition;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::constants::{OVERLAY_PLAYER, PRIMARY_PLAYER, SOUNDTRACK_GROUP};
use crate::engine::history::RecentlyPlayed;
use crate::engine::overlay::{OverlayContext, OverlayCoordinator};
use crate::engine::transition::{StepContext, TransitionState};
use crate::error::EngineError;
use crate::playback::gain::GainSnapshot;
use crate::playback::manager::PlayerManager;
use crate::playback::player::{AudioPlayer, PlayerOptions};
use crate::rules::condition::WorldView;
use crate::rules::entry::{EntryId, EntrySpec};
use crate::rules::registry::EntryRegistry;
use crate::signal::{SignalId, SignalMap, SignalRegistry};
use crate::source::TrackSource;

/// Per-tick input from the host. Signals not listed in `signal_updates`
/// keep their previous value; everything else overwrites wholesale.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    pub signal_updates: Vec<(SignalId, bool)>,
    pub location_label: String,
    pub region_label: String,
    pub proximity: HashMap<String, u32>,
    /// When set, no entry may win; the soundtrack fades to silence.
    pub blacklisted: bool,
    pub host_volume: f32,
    pub host_paused: bool,
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            signal_updates: Vec::new(),
            location_label: String::new(),
            region_label: String::new(),
            proximity: HashMap::new(),
            blacklisted: false,
            host_volume: 1.0,
            host_paused: false,
        }
    }
}

/// Last applied world state, kept between ticks.
struct WorldState {
    location: String,
    region: String,
    proximity: HashMap<String, u32>,
    blacklisted: bool,
    host_volume: f32,
    host_paused: bool,
}

impl WorldState {
    fn new() -> Self {
        Self {
            location: String::new(),
            region: String::new(),
            proximity: HashMap::new(),
            blacklisted: false,
            host_volume: 1.0,
            host_paused: false,
        }
    }
}

/// The soundtrack engine. One instance owns every mutable piece of state;
/// there are no globals.
pub struct Engine {
    config: EngineConfig,
    signals: SignalRegistry,
    signal_map: SignalMap,
    registry: EntryRegistry,
    manager: PlayerManager,
    primary: AudioPlayer,
    overlay_player: AudioPlayer,
    history: RecentlyPlayed,
    transition: TransitionState,
    overlay: OverlayCoordinator,
    world: WorldState,
}

impl Engine {
    /// Build an engine with its two built-in players.
    pub fn new(config: EngineConfig, source: Arc<dyn TrackSource>) -> Result<Self, EngineError> {
        let manager = PlayerManager::new(config.clone(), source);
        Self::with_manager(config, manager)
    }

    #[cfg(test)]
    pub(crate) fn new_detached(config: EngineConfig) -> Self {
        let manager = PlayerManager::new_detached(config.clone());
        Self::with_manager(config, manager).expect("fresh manager has no duplicate players")
    }

    fn with_manager(config: EngineConfig, mut manager: PlayerManager) -> Result<Self, EngineError> {
        let primary = manager.create(
            PRIMARY_PLAYER,
            PlayerOptions {
                group: SOUNDTRACK_GROUP.to_string(),
                looping: false,
            },
        )?;
        let overlay_player = manager.create(
            OVERLAY_PLAYER,
            PlayerOptions {
                group: SOUNDTRACK_GROUP.to_string(),
                looping: true,
            },
        )?;

        let history = RecentlyPlayed::new(config.history_capacity);
        Ok(Self {
            config,
            signals: SignalRegistry::new(),
            signal_map: SignalMap::new(),
            registry: EntryRegistry::new(),
            manager,
            primary,
            overlay_player,
            history,
            transition: TransitionState::new(),
            overlay: OverlayCoordinator::new(),
            world: WorldState::new(),
        })
    }

    /// Declare a signal; providers hold the returned handle.
    pub fn register_signal(&mut self, name: &str) -> SignalId {
        let id = self.signals.register(name);
        self.signal_map.resize_for(&self.signals);
        id
    }

    pub fn lookup_signal(&self, name: &str) -> Option<SignalId> {
        self.signals.lookup(name)
    }

    /// Register a rule entry. Conditions referencing undeclared signals are
    /// rejected here, never at tick time.
    pub fn register_entry(&mut self, spec: EntrySpec) -> Result<EntryId, EngineError> {
        self.registry.register(spec, &self.signals)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn players(&self) -> &PlayerManager {
        &self.manager
    }

    pub fn players_mut(&mut self) -> &mut PlayerManager {
        &mut self.manager
    }

    /// Advance the engine one tick.
    pub fn tick(&mut self, snapshot: WorldSnapshot) {
        for (id, value) in &snapshot.signal_updates {
            self.signal_map.set(*id, *value);
        }
        self.world.location = snapshot.location_label;
        self.world.region = snapshot.region_label;
        self.world.proximity = snapshot.proximity;
        self.world.blacklisted = snapshot.blacklisted;
        self.world.host_volume = snapshot.host_volume;
        self.world.host_paused = snapshot.host_paused;

        let view = WorldView {
            signals: &self.signal_map,
            location: &self.world.location,
            region: &self.world.region,
            proximity: &self.world.proximity,
        };
        let valid = self.registry.valid_entries(&view);

        let mut valid_flags = vec![false; self.registry.len()];
        for id in &valid {
            valid_flags[id.index()] = true;
        }
        self.transition
            .update_forced_flags(&self.registry, &valid_flags);

        let overlay_active = self.overlay.tick(OverlayContext {
            registry: &self.registry,
            valid: &valid,
            history: &mut self.history,
            primary: &self.primary,
            overlay_player: &self.overlay_player,
            config: &self.config,
        });

        // While the overlay drives the mix the main machine holds, so an
        // expiring overlay never yanks the primary entry out from under it.
        if !overlay_active {
            self.transition.step(StepContext {
                registry: &self.registry,
                valid: &valid,
                history: &mut self.history,
                player: &self.primary,
                config: &self.config,
                blacklisted: self.world.blacklisted,
            });
        }

        self.manager
            .tick(self.world.host_volume, self.world.host_paused);
    }

    /// True while the primary player has a running session.
    pub fn is_playing(&self) -> bool {
        self.primary.is_playing()
    }

    pub fn current_track(&self) -> Option<&str> {
        self.transition.current_track()
    }

    /// Human-readable label of the winning entry, e.g. `combat#3`.
    pub fn current_entry_label(&self) -> Option<String> {
        let id = self.transition.current_entry()?;
        let entry = self.registry.get(id)?;
        Some(format!("{}#{}", entry.rule_set(), id.index()))
    }

    pub fn is_overlay_active(&self) -> bool {
        self.overlay.is_active()
    }

    pub fn gain_snapshot(&self, player: &str) -> Option<GainSnapshot> {
        self.manager.get(player).map(AudioPlayer::gain_snapshot)
    }

    /// Manual stop; uses the same queued flag as rule-driven forced stops.
    pub fn force_stop(&mut self) {
        self.transition.queue_force_stop();
    }

    /// Manual start; uses the same queued flag as rule-driven forced starts.
    pub fn force_start(&mut self) {
        self.transition.queue_force_start();
    }

    /// Manual track change: stop now, restart as soon as the player is free.
    pub fn force_switch(&mut self) {
        self.transition.queue_force_stop();
        self.transition.queue_force_start();
    }

    /// Shut every player down. Workers exit cooperatively.
    pub fn shutdown(&mut self) {
        self.manager.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::condition::ConditionSpec;

    fn engine() -> Engine {
        Engine::new_detached(EngineConfig {
            switch_debounce_ticks: 2,
            start_delay_ticks: 0,
            fade_out_ticks: 4,
            fade_in_ticks: 4,
            ..EngineConfig::default()
        })
    }

    fn signal_entry(rule_set: &str, signal: &str, tracks: &[&str]) -> EntrySpec {
        EntrySpec {
            rule_set: rule_set.to_string(),
            conditions: vec![ConditionSpec {
                signals: vec![signal.to_string()],
                ..ConditionSpec::default()
            }],
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            ..EntrySpec::default()
        }
    }

    fn snapshot_with(updates: Vec<(SignalId, bool)>) -> WorldSnapshot {
        WorldSnapshot {
            signal_updates: updates,
            ..WorldSnapshot::default()
        }
    }

    #[test]
    fn night_signal_starts_a_track_after_the_delay() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a", "b"]))
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        let track = engine.current_track().map(str::to_string);
        assert!(matches!(track.as_deref(), Some("a") | Some("b")));
        assert_eq!(engine.current_entry_label().as_deref(), Some("night#0"));
    }

    #[test]
    fn unknown_signal_in_entry_is_rejected() {
        let mut engine = engine();
        let result = engine.register_entry(signal_entry("bad", "MISSING", &["a"]));
        assert!(matches!(result, Err(EngineError::UnknownSignal(_))));
    }

    #[test]
    fn losing_all_valid_entries_fades_the_primary_out() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a"]))
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        engine.players().get(PRIMARY_PLAYER).unwrap().force_playing(true);

        engine.tick(snapshot_with(vec![(night, false)]));
        let fade = engine.gain_snapshot(PRIMARY_PLAYER).unwrap().fade;
        assert!(fade < 1.0);
    }

    #[test]
    fn overlay_holds_the_primary_entry() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        let special = engine.register_signal("SPECIAL");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a"]))
            .unwrap();
        engine
            .register_entry(EntrySpec {
                overlay: true,
                ..signal_entry("special", "SPECIAL", &["o"])
            })
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        assert_eq!(engine.current_track(), Some("a"));
        engine.players().get(PRIMARY_PLAYER).unwrap().force_playing(true);

        engine.tick(snapshot_with(vec![(special, true)]));
        assert!(engine.is_overlay_active());
        // The machine held: the primary entry is untouched.
        assert_eq!(engine.current_track(), Some("a"));
        assert!(engine
            .players()
            .get(OVERLAY_PLAYER)
            .unwrap()
            .is_active());

        engine.tick(snapshot_with(vec![(special, false)]));
        assert!(!engine.is_overlay_active());
    }

    #[test]
    fn force_switch_restarts_through_the_shared_flags() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a"]))
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        engine.players().get(PRIMARY_PLAYER).unwrap().force_playing(true);

        engine.force_switch();
        engine.tick(snapshot_with(vec![]));
        // The forced stop fired immediately, no debounce.
        assert!(engine.gain_snapshot(PRIMARY_PLAYER).unwrap().fade < 1.0);
    }

    #[test]
    fn signals_persist_between_snapshots() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a"]))
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        assert_eq!(engine.current_track(), Some("a"));
        // No update for NIGHT: it stays true and the entry stays current.
        engine.players().get(PRIMARY_PLAYER).unwrap().force_playing(true);
        engine.tick(snapshot_with(vec![]));
        assert_eq!(engine.current_track(), Some("a"));
    }

    #[test]
    fn blacklisted_snapshot_silences_even_with_valid_entries() {
        let mut engine = engine();
        let night = engine.register_signal("NIGHT");
        engine
            .register_entry(signal_entry("night", "NIGHT", &["a"]))
            .unwrap();

        engine.tick(snapshot_with(vec![(night, true)]));
        engine.players().get(PRIMARY_PLAYER).unwrap().force_playing(true);

        let mut snapshot = snapshot_with(vec![]);
        snapshot.blacklisted = true;
        engine.tick(snapshot);
        assert!(engine.gain_snapshot(PRIMARY_PLAYER).unwrap().fade < 1.0);
    }
}
