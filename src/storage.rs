//! Local storage for recorded clips
//!
//! Keeps a copy of each finalized clip in the recordings directory,
//! or a custom location if configured.

use crate::recording::AudioClip;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default directory for kept recordings
pub fn default_recordings_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("TripChat").join("recordings"))
}

/// Ensure the recordings directory exists
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        info!("Created recordings directory: {:?}", dir);
    }
    Ok(())
}

/// File name for a kept clip, unique per clip and second
pub(crate) fn clip_file_name(clip: &AudioClip) -> String {
    let timestamp = clip.recorded_at.format("%Y-%m-%d-%H-%M-%S");
    format!("recording-{}-{}.{}", timestamp, clip.id, clip.extension())
}

/// Save a clip into `dir`
///
/// Returns the path to the saved file
pub fn save_clip(dir: &Path, clip: &AudioClip) -> Result<PathBuf, StorageError> {
    if clip.is_empty() {
        return Err(StorageError::EmptyClip);
    }

    ensure_dir(dir)?;
    let filepath = dir.join(clip_file_name(clip));

    let mut file = fs::File::create(&filepath).map_err(|e| StorageError::CreateFile {
        path: filepath.clone(),
        source: e,
    })?;

    file.write_all(&clip.data)
        .and_then(|_| file.flush())
        .map_err(|e| StorageError::WriteFile {
            path: filepath.clone(),
            source: e,
        })?;

    info!("Saved recording to: {:?}", filepath);
    Ok(filepath)
}

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Recording is empty")]
    EmptyClip,

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
