//! Engine configuration with serde support and sane defaults.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tunable parameters for the transition machine and the gain pipeline.
///
/// Every field has a default, so hosts can deserialize partial JSON payloads
/// and only override what they care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks the winning entry must stay changed before a fade-out starts.
    pub switch_debounce_ticks: u32,
    /// Ticks of silence before a newly winning entry starts its track.
    pub start_delay_ticks: u32,
    /// Duration of a fade to silence, in ticks.
    pub fade_out_ticks: u32,
    /// Duration of a fade to full level, in ticks.
    pub fade_in_ticks: u32,
    /// Capacity of the recently-played history used for repetition avoidance.
    pub history_capacity: usize,
    /// Leading span of decoded audio replaced with silence at session start.
    pub primer_silence_ms: f32,
    /// Decibel value an effective gain of 0% maps to.
    pub min_gain_db: f32,
    /// Decibel value an effective gain of 100% maps to.
    pub max_gain_db: f32,
    /// Absolute floor applied when the host volume or effective gain is zero.
    pub silent_db: f32,
    /// Exponent flattening the host volume curve before mixing it in.
    pub host_volume_exponent: f32,
    /// Quiet-factor target while the host is paused.
    pub paused_quiet_percent: f32,
    /// Per-tick step the quiet factor moves toward its target.
    pub paused_quiet_rate: f32,
    /// Maximum decoded chunks queued on the sink before backpressure.
    pub max_sink_chunks: usize,
    /// Attempts to open the output device before giving up on a session.
    pub output_open_retries: usize,
    /// Delay between output-device open attempts, in milliseconds.
    pub output_open_retry_ms: u64,
    /// Sleep interval of an idle player worker, in milliseconds.
    pub worker_idle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            switch_debounce_ticks: 100,
            start_delay_ticks: 40,
            fade_out_ticks: 80,
            fade_in_ticks: 40,
            history_capacity: 8,
            primer_silence_ms: 250.0,
            min_gain_db: -50.0,
            max_gain_db: 0.0,
            silent_db: -80.0,
            host_volume_exponent: 0.85,
            paused_quiet_percent: 0.7,
            paused_quiet_rate: 0.05,
            max_sink_chunks: 16,
            output_open_retries: 5,
            output_open_retry_ms: 100,
            worker_idle_ms: 10,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON string, filling omitted fields with
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(r#"{"fade_out_ticks": 10}"#).unwrap();
        assert_eq!(config.fade_out_ticks, 10);
        assert_eq!(config.fade_in_ticks, EngineConfig::default().fade_in_ticks);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json_str("{").is_err());
    }
}
