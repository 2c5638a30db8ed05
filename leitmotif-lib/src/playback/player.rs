//! One independent playback unit and its shared control state.
//!
//! The tick context talks to a player exclusively through atomic flags and
//! mutex-guarded value hand-off; the worker thread owns all blocking I/O.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rodio::Sink;

use crate::config::EngineConfig;
use crate::error::PlayerError;
use crate::playback::fade::{FadeOutcome, FadeState};
use crate::playback::gain::{db_to_linear, percent_to_db, GainLayers, GainSnapshot};
use crate::playback::worker;
use crate::source::TrackSource;

/// Construction options for a player.
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    /// Group the player belongs to, for collective ducking.
    pub group: String,
    /// Whether a finished track immediately re-queues itself.
    pub looping: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            group: String::new(),
            looping: false,
        }
    }
}

/// State shared between the tick context and the worker thread.
///
/// Each field has exactly one writer context, except the gain values, which
/// are idempotent overwrites safe to race on.
pub(crate) struct PlayerShared {
    pub(crate) name: String,
    pub(crate) group: String,
    pub(crate) looping: AtomicBool,
    pub(crate) kill: AtomicBool,
    pub(crate) queued: AtomicBool,
    pub(crate) playing: AtomicBool,
    pub(crate) complete: AtomicBool,
    pub(crate) stop_requested: AtomicBool,
    pub(crate) worker_alive: AtomicBool,
    pub(crate) session_id: AtomicU64,
    pub(crate) pending_track: Mutex<Option<String>>,
    pub(crate) current_track: Mutex<Option<String>>,
    pub(crate) gain: Mutex<GainLayers>,
    pub(crate) fade: Mutex<FadeState>,
    pub(crate) sink: Mutex<Sink>,
    pub(crate) last_error: Mutex<Option<PlayerError>>,
}

/// Handle to one playback unit. Clones share the same underlying player.
#[derive(Clone)]
pub struct AudioPlayer {
    pub(crate) shared: Arc<PlayerShared>,
}

impl AudioPlayer {
    /// Create a player and spawn its decode worker.
    pub(crate) fn new(
        name: &str,
        options: PlayerOptions,
        source: Arc<dyn TrackSource>,
        config: &EngineConfig,
        spawn_worker: bool,
    ) -> Self {
        let (sink, _queue) = Sink::new();
        let shared = Arc::new(PlayerShared {
            name: name.to_string(),
            group: options.group,
            looping: AtomicBool::new(options.looping),
            kill: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            complete: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            worker_alive: AtomicBool::new(false),
            session_id: AtomicU64::new(0),
            pending_track: Mutex::new(None),
            current_track: Mutex::new(None),
            gain: Mutex::new(GainLayers::new()),
            fade: Mutex::new(FadeState::new()),
            sink: Mutex::new(sink),
            last_error: Mutex::new(None),
        });

        if spawn_worker {
            worker::spawn(shared.clone(), source, config.clone());
        }

        AudioPlayer { shared }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn group(&self) -> &str {
        &self.shared.group
    }

    /// Hand the worker a track to play on the next `play()`.
    pub fn set_song(&self, logical_name: &str) {
        let mut pending = self.shared.pending_track.lock().unwrap();
        *pending = Some(logical_name.to_string());
        drop(pending);
        self.shared.complete.store(false, Ordering::SeqCst);
    }

    /// Queue playback of the pending track.
    pub fn play(&self) {
        self.shared.queued.store(true, Ordering::SeqCst);
    }

    /// Request the current session to stop and drop any pending track.
    pub fn stop(&self) {
        self.shared.queued.store(false, Ordering::SeqCst);
        let mut pending = self.shared.pending_track.lock().unwrap();
        *pending = None;
        drop(pending);
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Aim the fade layer at `target` over `duration_ticks`.
    pub fn fade(
        &self,
        target: f32,
        duration_ticks: u32,
        stop_on_fade_out: bool,
        reset_on_fade_out: bool,
    ) {
        let mut fade = self.shared.fade.lock().unwrap();
        fade.set(target, duration_ticks, stop_on_fade_out, reset_on_fade_out);
    }

    /// Drop the fade level to zero and aim it at full over `duration_ticks`.
    pub fn begin_fade_in(&self, duration_ticks: u32) {
        let mut fade = self.shared.fade.lock().unwrap();
        fade.set_percent(0.0);
        fade.set(1.0, duration_ticks, false, false);
    }

    pub fn set_gain_percent(&self, percent: f32) {
        self.shared.gain.lock().unwrap().set_user(percent);
    }

    pub fn set_duck_percent(&self, percent: f32) {
        self.shared.gain.lock().unwrap().set_duck(percent);
    }

    /// Overwrite the fade level directly, without a ramp.
    pub fn set_fade_percent(&self, percent: f32) {
        self.shared.fade.lock().unwrap().set_percent(percent);
    }

    pub fn set_mute(&self, mute: bool) {
        self.shared.gain.lock().unwrap().set_mute(mute);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    pub fn is_queued(&self) -> bool {
        self.shared.queued.load(Ordering::SeqCst)
    }

    /// True while a session is running or about to run.
    pub fn is_active(&self) -> bool {
        self.is_playing() || self.is_queued()
    }

    /// True once a non-looping track has finished naturally.
    pub fn is_complete(&self) -> bool {
        self.shared.complete.load(Ordering::SeqCst)
    }

    /// True while the decode worker thread is alive.
    pub fn has_worker(&self) -> bool {
        self.shared.worker_alive.load(Ordering::Relaxed)
    }

    pub fn current_track(&self) -> Option<String> {
        self.shared.current_track.lock().unwrap().clone()
    }

    /// Drain the last session failure, if any. Read once per tick by the
    /// manager; nothing is ever invoked from the worker thread.
    pub fn take_last_error(&self) -> Option<PlayerError> {
        self.shared.last_error.lock().unwrap().take()
    }

    pub fn gain_snapshot(&self) -> GainSnapshot {
        let gain = self.shared.gain.lock().unwrap();
        let fade = self.shared.fade.lock().unwrap();
        GainSnapshot {
            user: gain.user(),
            duck: gain.duck(),
            quiet: gain.quiet(),
            fade: fade.percent(),
            mute: gain.is_muted(),
        }
    }

    /// Shut the player down: the worker observes the kill flag at its next
    /// opportunity, closes its session, and exits.
    pub fn close(&self) {
        self.shared.kill.store(true, Ordering::SeqCst);
        self.shared.queued.store(false, Ordering::SeqCst);
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Advance the fade one tick; returns the outcome plus the configured
    /// side-effect flags so the manager can act on them.
    pub(crate) fn step_fade(&self) -> (FadeOutcome, bool, bool) {
        let mut fade = self.shared.fade.lock().unwrap();
        let outcome = fade.step();
        (outcome, fade.stop_on_fade_out(), fade.reset_on_fade_out())
    }

    /// Reset the fade to neutral after a completed fade-out.
    pub(crate) fn reset_fade(&self) {
        self.shared.fade.lock().unwrap().reset();
    }

    /// Move the quiet factor toward its target.
    pub(crate) fn step_quiet(&self, target: f32, rate: f32) {
        self.shared.gain.lock().unwrap().step_quiet(target, rate);
    }

    /// Compose the layers and push the resulting volume to the sink.
    pub(crate) fn apply_gain(&self, group_duck: f32, host_volume: f32, config: &EngineConfig) {
        let fade_percent = self.shared.fade.lock().unwrap().percent();
        let effective = self.shared.gain.lock().unwrap().effective(
            fade_percent,
            group_duck,
            host_volume,
            config.host_volume_exponent,
        );
        let db = percent_to_db(effective, host_volume, config);
        let sink = self.shared.sink.lock().unwrap();
        sink.set_volume(db_to_linear(db));
    }

    /// Pause the sink of a fully ducked player and resume it once the fade
    /// comes back up, preserving the playback position while suspended.
    pub(crate) fn sync_suspension(&self) {
        if !self.is_playing() {
            return;
        }
        let fade = self.shared.fade.lock().unwrap();
        let ducked_out = fade.percent() == 0.0 && !fade.stop_on_fade_out();
        let level = fade.percent();
        drop(fade);

        let sink = self.shared.sink.lock().unwrap();
        if ducked_out {
            sink.pause();
        } else if level > 0.0 && sink.is_paused() {
            sink.play();
        }
    }

    #[cfg(test)]
    pub(crate) fn force_playing(&self, playing: bool) {
        self.shared.playing.store(playing, Ordering::SeqCst);
        if playing {
            self.shared.queued.store(false, Ordering::SeqCst);
        }
    }

    #[cfg(test)]
    pub(crate) fn force_complete(&self) {
        self.shared.playing.store(false, Ordering::SeqCst);
        self.shared.queued.store(false, Ordering::SeqCst);
        self.shared.complete.store(true, Ordering::SeqCst);
    }
}
