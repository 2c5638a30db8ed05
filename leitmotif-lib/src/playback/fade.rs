//! Tick-domain linear fade integration.
//!
//! The integrator only ever moves `percent` toward `target` by `1/duration`
//! per tick; stop/reset side-effects are signaled to the caller, never
//! performed here.

use crate::playback::gain::clamp_percent;

/// Outcome of one integrator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeOutcome {
    /// Already at the target; nothing moved.
    Holding,
    /// Moved toward the target this tick.
    Moving,
    /// Reached zero this tick with a zero target.
    ReachedZero,
}

/// Linear fade toward a target, stepped once per tick.
#[derive(Debug, Clone)]
pub struct FadeState {
    percent: f32,
    target: f32,
    duration_ticks: u32,
    stop_on_fade_out: bool,
    reset_on_fade_out: bool,
}

impl FadeState {
    /// Neutral fade: fully up, holding.
    pub fn new() -> Self {
        Self {
            percent: 1.0,
            target: 1.0,
            duration_ticks: 1,
            stop_on_fade_out: false,
            reset_on_fade_out: false,
        }
    }

    /// Aim the fade at a new target over `duration_ticks`.
    pub fn set(
        &mut self,
        target: f32,
        duration_ticks: u32,
        stop_on_fade_out: bool,
        reset_on_fade_out: bool,
    ) {
        self.target = clamp_percent(target);
        self.duration_ticks = duration_ticks.max(1);
        self.stop_on_fade_out = stop_on_fade_out;
        self.reset_on_fade_out = reset_on_fade_out;
    }

    /// Force the current level, e.g. to 0 before a fade-in.
    pub fn set_percent(&mut self, percent: f32) {
        self.percent = clamp_percent(percent);
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn stop_on_fade_out(&self) -> bool {
        self.stop_on_fade_out
    }

    pub fn reset_on_fade_out(&self) -> bool {
        self.reset_on_fade_out
    }

    /// Back to neutral: fully up, no pending side-effects.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance one tick. Never overshoots the target.
    pub(crate) fn step(&mut self) -> FadeOutcome {
        if self.percent == self.target {
            return FadeOutcome::Holding;
        }

        let step = 1.0 / self.duration_ticks as f32;
        if self.percent > self.target {
            self.percent = (self.percent - step).max(self.target);
        } else {
            self.percent = (self.percent + step).min(self.target);
        }

        if self.percent == 0.0 && self.target == 0.0 {
            FadeOutcome::ReachedZero
        } else {
            FadeOutcome::Moving
        }
    }
}

impl Default for FadeState {
    fn default() -> Self {
        Self::new()
    }
}
