//! Overlay coordination: duck the primary, drive the secondary.
//!
//! While any valid entry requests overlay behavior the primary player is
//! faded to zero without stop semantics, so the integrator suspends it at
//! zero and its playback position survives, while the overlay player runs
//! independently. The main transition machine is held for the duration.

use log::debug;

use crate::config::EngineConfig;
use crate::engine::history::RecentlyPlayed;
use crate::engine::selector::pick_track;
use crate::playback::player::AudioPlayer;
use crate::rules::entry::EntryId;
use crate::rules::registry::EntryRegistry;

/// Everything one overlay tick needs, borrowed from the engine.
pub(crate) struct OverlayContext<'a> {
    pub registry: &'a EntryRegistry,
    pub valid: &'a [EntryId],
    pub history: &'a mut RecentlyPlayed,
    pub primary: &'a AudioPlayer,
    pub overlay_player: &'a AudioPlayer,
    pub config: &'a EngineConfig,
}

/// Policy layer owning the overlay activation state.
pub(crate) struct OverlayCoordinator {
    active: bool,
    entry: Option<EntryId>,
}

impl OverlayCoordinator {
    pub fn new() -> Self {
        Self {
            active: false,
            entry: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_entry(&self) -> Option<EntryId> {
        self.entry
    }

    /// Advance one tick; returns whether overlay coordination is active.
    pub fn tick(&mut self, ctx: OverlayContext<'_>) -> bool {
        let overlay_entry = ctx
            .valid
            .iter()
            .copied()
            .find(|id| ctx.registry.get(*id).map_or(false, |e| e.overlay));

        match overlay_entry {
            Some(id) => {
                if !self.active {
                    debug!("overlay activating for entry {}", id.index());
                    self.active = true;
                    // Duck, don't stop: the primary keeps its position and
                    // resumes from it when the overlay ends.
                    ctx.primary
                        .fade(0.0, ctx.config.fade_out_ticks, false, false);
                }

                if self.entry != Some(id) || !ctx.overlay_player.is_active() {
                    if self.entry != Some(id) && ctx.overlay_player.is_active() {
                        ctx.overlay_player.stop();
                    }
                    if let Some(track) =
                        pick_track(id, ctx.registry, ctx.valid, ctx.history)
                    {
                        ctx.overlay_player.set_song(&track);
                        ctx.overlay_player.begin_fade_in(ctx.config.fade_in_ticks);
                        ctx.overlay_player.play();
                    }
                    self.entry = Some(id);
                }
            }
            None if self.active => {
                debug!("overlay deactivating");
                self.active = false;
                self.entry = None;
                ctx.primary
                    .fade(1.0, ctx.config.fade_in_ticks, false, false);
                ctx.overlay_player
                    .fade(0.0, ctx.config.fade_out_ticks, true, true);
            }
            None => {}
        }

        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::manager::PlayerManager;
    use crate::playback::player::PlayerOptions;
    use crate::rules::condition::ConditionSpec;
    use crate::rules::entry::EntrySpec;
    use crate::signal::SignalRegistry;

    struct Fixture {
        registry: EntryRegistry,
        manager: PlayerManager,
        primary: AudioPlayer,
        overlay_player: AudioPlayer,
        history: RecentlyPlayed,
        coordinator: OverlayCoordinator,
        config: EngineConfig,
    }

    fn fixture(entries: Vec<EntrySpec>) -> (Fixture, Vec<EntryId>) {
        let mut signals = SignalRegistry::new();
        signals.register("ANY");
        let mut registry = EntryRegistry::new();
        let ids = entries
            .into_iter()
            .map(|spec| registry.register(spec, &signals).unwrap())
            .collect();

        let config = EngineConfig {
            fade_out_ticks: 4,
            fade_in_ticks: 4,
            ..EngineConfig::default()
        };
        let mut manager = PlayerManager::new_detached(config.clone());
        let primary = manager.create("primary", PlayerOptions::default()).unwrap();
        let overlay_player = manager
            .create(
                "overlay",
                PlayerOptions {
                    group: String::new(),
                    looping: true,
                },
            )
            .unwrap();

        (
            Fixture {
                registry,
                manager,
                primary,
                overlay_player,
                history: RecentlyPlayed::new(8),
                coordinator: OverlayCoordinator::new(),
                config,
            },
            ids,
        )
    }

    fn overlay_entry(rule_set: &str, tracks: &[&str]) -> EntrySpec {
        EntrySpec {
            rule_set: rule_set.to_string(),
            overlay: true,
            conditions: vec![ConditionSpec {
                signals: vec!["ANY".to_string()],
                ..ConditionSpec::default()
            }],
            tracks: tracks.iter().map(|t| t.to_string()).collect(),
            ..EntrySpec::default()
        }
    }

    fn tick(fixture: &mut Fixture, valid: &[EntryId]) -> bool {
        fixture.coordinator.tick(OverlayContext {
            registry: &fixture.registry,
            valid,
            history: &mut fixture.history,
            primary: &fixture.primary,
            overlay_player: &fixture.overlay_player,
            config: &fixture.config,
        })
    }

    #[test]
    fn activation_ducks_primary_without_stop_semantics() {
        let (mut fixture, ids) = fixture(vec![overlay_entry("ov", &["o"])]);
        fixture.primary.force_playing(true);

        assert!(tick(&mut fixture, &ids));
        assert!(fixture.overlay_player.is_queued());
        assert_eq!(fixture.coordinator.current_entry(), Some(ids[0]));

        for _ in 0..fixture.config.fade_out_ticks {
            fixture.manager.tick(1.0, false);
        }
        // Primary fully ducked but never stopped.
        assert_eq!(fixture.primary.gain_snapshot().fade, 0.0);
        assert!(fixture.primary.is_playing());
    }

    #[test]
    fn deactivation_restores_primary_and_releases_overlay() {
        let (mut fixture, ids) = fixture(vec![overlay_entry("ov", &["o"])]);
        fixture.primary.force_playing(true);
        tick(&mut fixture, &ids);
        fixture.overlay_player.force_playing(true);

        assert!(!tick(&mut fixture, &[]));
        assert!(fixture.coordinator.current_entry().is_none());

        for _ in 0..fixture.config.fade_out_ticks {
            fixture.manager.tick(1.0, false);
        }
        // Overlay stopped through the integrator; primary faded back up.
        assert!(!fixture.overlay_player.is_queued());
        assert_eq!(fixture.overlay_player.gain_snapshot().fade, 1.0);
        assert_eq!(fixture.primary.gain_snapshot().fade, 1.0);
    }

    #[test]
    fn overlay_entry_change_restarts_the_overlay_player() {
        let (mut fixture, ids) = fixture(vec![
            overlay_entry("ov1", &["o1"]),
            overlay_entry("ov2", &["o2"]),
        ]);
        tick(&mut fixture, &ids);
        fixture.overlay_player.force_playing(true);

        let only_second = [ids[1]];
        tick(&mut fixture, &only_second);
        assert_eq!(fixture.coordinator.current_entry(), Some(ids[1]));
        assert!(fixture.overlay_player.is_queued());
    }

    #[test]
    fn idle_without_overlay_entries_is_a_no_op() {
        let (mut fixture, _ids) = fixture(vec![overlay_entry("ov", &["o"])]);
        assert!(!tick(&mut fixture, &[]));
        assert!(!fixture.overlay_player.is_active());
    }
}
