//! Layered gain model and decibel mapping.
//!
//! Every layer is a percentage in [0, 1]. Layers multiply into one effective
//! percentage, which maps onto a decibel range before the sink volume is set.

use crate::config::EngineConfig;

/// Clamp a gain layer percentage into [0, 1]. NaN collapses to 0.
pub fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 1.0)
    }
}

/// Convert decibels to a linear amplitude multiplier.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Map an effective percentage onto the configured decibel range.
///
/// A host volume of exactly zero, or an effective percentage of exactly
/// zero, maps to the silent floor rather than the lerp minimum so that a
/// completed fade-out is actually inaudible.
pub(crate) fn percent_to_db(percent: f32, host_volume: f32, config: &EngineConfig) -> f32 {
    let percent = clamp_percent(percent);
    if host_volume <= 0.0 || percent <= 0.0 {
        return config.silent_db;
    }
    config.min_gain_db + (config.max_gain_db - config.min_gain_db) * percent
}

/// Mutable gain layers owned by one player.
#[derive(Debug, Clone)]
pub struct GainLayers {
    user: f32,
    duck: f32,
    quiet: f32,
    mute: bool,
}

impl GainLayers {
    pub fn new() -> Self {
        Self {
            user: 1.0,
            duck: 1.0,
            quiet: 1.0,
            mute: false,
        }
    }

    pub fn set_user(&mut self, percent: f32) {
        self.user = clamp_percent(percent);
    }

    pub fn set_duck(&mut self, percent: f32) {
        self.duck = clamp_percent(percent);
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn user(&self) -> f32 {
        self.user
    }

    pub fn duck(&self) -> f32 {
        self.duck
    }

    pub fn quiet(&self) -> f32 {
        self.quiet
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// Move the quiet factor toward `target` by at most `rate`.
    pub fn step_quiet(&mut self, target: f32, rate: f32) {
        let target = clamp_percent(target);
        if self.quiet > target {
            self.quiet = (self.quiet - rate).max(target);
        } else {
            self.quiet = (self.quiet + rate).min(target);
        }
    }

    /// Compose every layer into one effective percentage.
    pub fn effective(
        &self,
        fade_percent: f32,
        group_duck: f32,
        host_volume: f32,
        host_exponent: f32,
    ) -> f32 {
        let user = if self.mute { 0.0 } else { self.user };
        let host = clamp_percent(host_volume).powf(host_exponent);
        user * self.duck
            * clamp_percent(fade_percent)
            * clamp_percent(group_duck)
            * self.quiet
            * host
    }
}

impl Default for GainLayers {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only snapshot of a player's gain layers for query surfaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSnapshot {
    pub user: f32,
    pub duck: f32,
    pub quiet: f32,
    pub fade: f32,
    pub mute: bool,
}
