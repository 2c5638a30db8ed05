//! Player registry, fade integration, and per-tick gain application.
//!
//! `tick()` is the only place fade side-effects (stop, reset, suspension)
//! are triggered; everything upstream only ever sets targets.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::playback::fade::FadeOutcome;
use crate::playback::gain::clamp_percent;
use crate::playback::player::{AudioPlayer, PlayerOptions};
use crate::source::TrackSource;

/// Registry of named, grouped players. Mutation happens only from the tick
/// context.
pub struct PlayerManager {
    players: Vec<AudioPlayer>,
    group_duck: HashMap<String, f32>,
    source: Arc<dyn TrackSource>,
    config: EngineConfig,
    spawn_workers: bool,
}

impl PlayerManager {
    pub fn new(config: EngineConfig, source: Arc<dyn TrackSource>) -> Self {
        Self {
            players: Vec::new(),
            group_duck: HashMap::new(),
            source,
            config,
            spawn_workers: true,
        }
    }

    /// Manager whose players never get a worker thread; playback state is
    /// driven by hand. Test harness only.
    #[cfg(test)]
    pub(crate) fn new_detached(config: EngineConfig) -> Self {
        Self {
            players: Vec::new(),
            group_duck: HashMap::new(),
            source: Arc::new(crate::source::NullSource),
            config,
            spawn_workers: false,
        }
    }

    /// Create and register a player.
    pub fn create(&mut self, name: &str, options: PlayerOptions) -> Result<AudioPlayer, EngineError> {
        if self.players.iter().any(|p| p.name() == name) {
            return Err(EngineError::DuplicatePlayer(name.to_string()));
        }
        let player = AudioPlayer::new(
            name,
            options,
            self.source.clone(),
            &self.config,
            self.spawn_workers,
        );
        self.players.push(player.clone());
        Ok(player)
    }

    pub fn get(&self, name: &str) -> Option<&AudioPlayer> {
        self.players.iter().find(|p| p.name() == name)
    }

    pub fn get_by_group(&self, group: &str) -> Vec<&AudioPlayer> {
        self.players.iter().filter(|p| p.group() == group).collect()
    }

    /// Set the duck level applied to every player in `group`.
    pub fn set_group_duck(&mut self, group: &str, percent: f32) {
        self.group_duck
            .insert(group.to_string(), clamp_percent(percent));
    }

    pub fn group_duck(&self, group: &str) -> f32 {
        self.group_duck.get(group).copied().unwrap_or(1.0)
    }

    /// Integrate fades and apply gains for every player.
    pub fn tick(&mut self, host_volume: f32, host_paused: bool) {
        let quiet_target = if host_paused {
            self.config.paused_quiet_percent
        } else {
            1.0
        };

        for player in &self.players {
            if let Some(err) = player.take_last_error() {
                warn!("player '{}': {}", player.name(), err);
            }

            let (outcome, stop_on_fade_out, reset_on_fade_out) = player.step_fade();
            if outcome == FadeOutcome::ReachedZero {
                if stop_on_fade_out {
                    player.stop();
                }
                if reset_on_fade_out {
                    player.reset_fade();
                }
            }

            player.step_quiet(quiet_target, self.config.paused_quiet_rate);

            let group_duck = self.group_duck.get(player.group()).copied().unwrap_or(1.0);
            player.apply_gain(group_duck, host_volume, &self.config);
            player.sync_suspension();
        }
    }

    /// Shut every player down.
    pub fn close_all(&mut self) {
        for player in &self.players {
            player.close();
        }
    }
}
