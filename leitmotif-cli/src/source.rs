//! Directory-backed track resolution.

use std::fs::File;
use std::path::{Path, PathBuf};

use leitmotif_lib::error::PlayerError;
use leitmotif_lib::source::{TrackResource, TrackSource};

const EXTENSIONS: &[&str] = &["ogg", "mp3", "flac", "wav"];

/// Resolves logical track names against files in a music directory.
///
/// A name is tried verbatim first, then with each known audio extension
/// appended.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, logical_name: &str) -> Option<PathBuf> {
        let direct = self.root.join(logical_name);
        if direct.is_file() {
            return Some(direct);
        }
        for extension in EXTENSIONS {
            let candidate = self.root.join(format!("{}.{}", logical_name, extension));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl TrackSource for DirectorySource {
    fn open(&self, logical_name: &str) -> Result<TrackResource, PlayerError> {
        let path = self
            .resolve(logical_name)
            .ok_or_else(|| PlayerError::ResourceNotFound(logical_name.to_string()))?;
        let file = File::open(&path)
            .map_err(|_| PlayerError::ResourceNotFound(logical_name.to_string()))?;

        Ok(TrackResource {
            stream: Box::new(file),
            extension: extension_of(&path),
        })
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_names_with_and_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join("calm.ogg")).unwrap();
        file.write_all(b"not really audio").unwrap();

        let source = DirectorySource::new(dir.path());
        let resource = source.open("calm").unwrap();
        assert_eq!(resource.extension.as_deref(), Some("ogg"));

        let resource = source.open("calm.ogg").unwrap();
        assert_eq!(resource.extension.as_deref(), Some("ogg"));
    }

    #[test]
    fn missing_tracks_fail_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(
            source.open("ghost"),
            Err(PlayerError::ResourceNotFound(name)) if name == "ghost"
        ));
    }
}
