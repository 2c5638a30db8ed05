//! Track resource resolution boundary.
//!
//! Hosts decide how logical track names map onto bytes (loose files,
//! archives, network caches); the engine only needs something seekable that
//! the decoder can probe.

use symphonia::core::io::MediaSource;

use crate::error::PlayerError;

/// Opened track resource handed to a decode worker.
pub struct TrackResource {
    /// Seekable byte stream containing the encoded audio.
    pub stream: Box<dyn MediaSource>,
    /// Extension hint for format probing, e.g. `ogg`.
    pub extension: Option<String>,
}

/// Resolves logical track names to decodable byte streams.
pub trait TrackSource: Send + Sync {
    /// Open the resource backing `logical_name`.
    fn open(&self, logical_name: &str) -> Result<TrackResource, PlayerError>;
}

/// Source that resolves nothing; every player session fails with
/// `ResourceNotFound`.
#[cfg(test)]
pub(crate) struct NullSource;

#[cfg(test)]
impl TrackSource for NullSource {
    fn open(&self, logical_name: &str) -> Result<TrackResource, PlayerError> {
        Err(PlayerError::ResourceNotFound(logical_name.to_string()))
    }
}
