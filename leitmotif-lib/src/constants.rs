//! Shared defaults for playback and engine wiring.

/// Fallback sample rate used when a decoded track does not declare one (Hz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Name of the built-in player carrying the main soundtrack.
pub const PRIMARY_PLAYER: &str = "primary";

/// Name of the built-in player carrying overlay tracks.
pub const OVERLAY_PLAYER: &str = "overlay";

/// Group shared by the built-in players, used for collective ducking.
pub const SOUNDTRACK_GROUP: &str = "soundtrack";
