//! Tick-driven transition core: hold, fade out, or start the next track.
//!
//! The machine only ever sets fade targets and queues playback; actual
//! stop/reset side-effects happen in the manager's integrator. Debounce
//! counters reset to zero whenever the condition they measure is no longer
//! true, so they cannot drift across unrelated ticks.

use log::{debug, info, warn};
use rand::Rng;

use crate::config::EngineConfig;
use crate::engine::history::RecentlyPlayed;
use crate::engine::selector::pick_track;
use crate::playback::player::AudioPlayer;
use crate::rules::entry::EntryId;
use crate::rules::registry::EntryRegistry;

/// Everything one `step` needs, borrowed from the engine.
pub(crate) struct StepContext<'a> {
    pub registry: &'a EntryRegistry,
    pub valid: &'a [EntryId],
    pub history: &'a mut RecentlyPlayed,
    pub player: &'a AudioPlayer,
    pub config: &'a EngineConfig,
    pub blacklisted: bool,
}

/// Mutable transition bookkeeping, owned by the engine.
pub(crate) struct TransitionState {
    current_track: Option<String>,
    current_entry: Option<EntryId>,
    switch_wait: u32,
    start_wait: u32,
    queued_stop: bool,
    queued_start: bool,
    prev_valid: Vec<bool>,
    tick_roll: Option<f64>,
    warned_missing_entry: bool,
}

impl TransitionState {
    pub fn new() -> Self {
        Self {
            current_track: None,
            current_entry: None,
            switch_wait: 0,
            start_wait: 0,
            queued_stop: false,
            queued_start: false,
            prev_valid: Vec::new(),
            tick_roll: None,
            warned_missing_entry: false,
        }
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current_track.as_deref()
    }

    pub fn current_entry(&self) -> Option<EntryId> {
        self.current_entry
    }

    /// Queue a forced stop; shared by rule-driven and manual transitions.
    pub fn queue_force_stop(&mut self) {
        self.queued_stop = true;
    }

    /// Queue a forced start; shared by rule-driven and manual transitions.
    pub fn queue_force_start(&mut self) {
        self.queued_start = true;
    }

    /// One random draw per tick, shared across every forced-flag check so
    /// co-declared behaviors stay correlated.
    fn roll(&mut self) -> f64 {
        *self
            .tick_roll
            .get_or_insert_with(|| rand::thread_rng().gen())
    }

    /// Queue forced flags for entries whose validity flipped this tick.
    pub fn update_forced_flags(&mut self, registry: &EntryRegistry, valid_flags: &[bool]) {
        self.tick_roll = None;
        self.prev_valid.resize(valid_flags.len(), false);

        for (index, now_valid) in valid_flags.iter().copied().enumerate() {
            if self.prev_valid[index] == now_valid {
                continue;
            }
            let Some(entry) = registry.get(EntryId(index)) else {
                continue;
            };

            let declared = if now_valid {
                entry.force_stop_on_valid || entry.force_start_on_valid
            } else {
                entry.force_stop_on_invalid
            };
            if declared && self.roll() < entry.force_chance {
                if now_valid && entry.force_stop_on_valid {
                    self.queued_stop = true;
                }
                if now_valid && entry.force_start_on_valid {
                    self.queued_start = true;
                }
                if !now_valid && entry.force_stop_on_invalid {
                    self.queued_stop = true;
                }
            }
        }

        self.prev_valid.copy_from_slice(valid_flags);
    }

    /// Advance the machine one tick.
    pub fn step(&mut self, ctx: StepContext<'_>) {
        let new_entry = if ctx.blacklisted {
            None
        } else {
            self.first_primary_entry(ctx.registry, ctx.valid)
        };

        let playing = ctx.player.is_playing();
        let active = playing || ctx.player.is_queued();

        // The previous track finished or was stopped; release bookkeeping.
        if !active && self.current_track.is_some() {
            debug!(
                "track '{}' ended",
                self.current_track.as_deref().unwrap_or_default()
            );
            self.current_track = None;
            self.current_entry = None;
        }

        // A stop only ever targets running playback; a stale one must not
        // survive to kill the next track right after it starts.
        if !playing {
            self.queued_stop = false;
        }

        let Some(new_id) = new_entry else {
            // Nothing valid: silence is not negotiable, so the fade-out is
            // immediate rather than debounced.
            if playing {
                ctx.player
                    .fade(0.0, ctx.config.fade_out_ticks, true, true);
            }
            self.switch_wait = 0;
            self.start_wait = 0;
            self.queued_stop = false;
            self.queued_start = false;
            return;
        };

        let switching = self.current_entry != Some(new_id);

        // Fake-swap: the new entry already covers the playing track, so
        // adopt it without an audible restart. A queued forced stop wins
        // over the swap.
        if switching && playing && !self.queued_stop {
            if let (Some(track), Some(entry)) =
                (self.current_track.as_deref(), ctx.registry.get(new_id))
            {
                if entry.tracks.iter().any(|t| t == track) {
                    debug!("adopting entry {} without restart", new_id.index());
                    self.current_entry = Some(new_id);
                    self.switch_wait = 0;
                    self.start_wait = 0;
                    return;
                }
            }
        }

        let wants_stop = playing && (switching || self.queued_stop);
        if wants_stop {
            self.switch_wait += 1;
            if self.queued_stop || self.switch_wait > ctx.config.switch_debounce_ticks {
                ctx.player
                    .fade(0.0, ctx.config.fade_out_ticks, true, true);
                self.queued_stop = false;
                self.switch_wait = 0;
            }
        } else {
            self.switch_wait = 0;
        }

        let wants_start = !active;
        if wants_start {
            self.start_wait += 1;
            if self.queued_start || self.start_wait > ctx.config.start_delay_ticks {
                if let Some(track) = pick_track(new_id, ctx.registry, ctx.valid, ctx.history) {
                    info!("starting '{}' for entry {}", track, new_id.index());
                    ctx.player.set_song(&track);
                    ctx.player.begin_fade_in(ctx.config.fade_in_ticks);
                    ctx.player.play();
                    self.current_entry = Some(new_id);
                    self.current_track = Some(track);
                }
                self.queued_start = false;
                self.start_wait = 0;
            }
        } else {
            self.start_wait = 0;
        }
    }

    /// First valid entry that does not request overlay behavior.
    fn first_primary_entry(
        &mut self,
        registry: &EntryRegistry,
        valid: &[EntryId],
    ) -> Option<EntryId> {
        valid
            .iter()
            .copied()
            .find(|id| match registry.get(*id) {
                Some(entry) => !entry.overlay,
                None => {
                    if !self.warned_missing_entry {
                        warn!("valid-entry list references a missing entry; skipping");
                        self.warned_missing_entry = true;
                    }
                    false
                }
            })
    }
}
