//! Error types for engine setup and playback sessions.

use std::fmt::{Display, Formatter};

/// Error type for playback worker sessions.
///
/// Worker failures never propagate to the tick context; they are stored in
/// the player's last-error slot and drained once per tick by the manager.
#[derive(Debug)]
pub enum PlayerError {
    /// The requested logical track could not be resolved to a resource.
    ResourceNotFound(String),
    /// The resource was found but could not be probed or decoded.
    DecodeFailure(String),
    /// The output device could not be opened or driven.
    Output(String),
}

impl Display for PlayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceNotFound(name) => write!(f, "track not found: {}", name),
            Self::DecodeFailure(err) => write!(f, "decode error: {}", err),
            Self::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for PlayerError {}

/// Error type for engine construction and rule registration.
#[derive(Debug)]
pub enum EngineError {
    /// An entry condition references a signal no provider has declared.
    UnknownSignal(String),
    /// A player with the same name already exists in the manager.
    DuplicatePlayer(String),
    /// A named player is missing from the manager.
    UnknownPlayer(String),
    /// A configuration payload failed to parse.
    InvalidConfig(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSignal(name) => write!(f, "unknown signal: {}", name),
            Self::DuplicatePlayer(name) => write!(f, "player already exists: {}", name),
            Self::UnknownPlayer(name) => write!(f, "no such player: {}", name),
            Self::InvalidConfig(err) => write!(f, "invalid config: {}", err),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}
