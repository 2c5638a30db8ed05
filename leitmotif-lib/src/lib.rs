//! # Leitmotif
//!
//! Context-reactive soundtrack engine. Weighted rule entries are evaluated
//! against live boolean signals every tick; a transition state machine
//! selects and crossfades tracks, and one decode thread per player feeds
//! the audio sink through a layered gain pipeline.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod playback;
pub mod rules;
pub mod signal;
pub mod source;
