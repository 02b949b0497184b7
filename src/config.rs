//! Application configuration
//!
//! Defaults come from the embedded `config.toml`. A user file (given on the
//! command line, or `TripChat/config.toml` in the config directory) is layered
//! on top, then `TRIPCHAT_BACKEND_URL` from the environment or `.env`.

use crate::error::AppError;
use crate::storage;
use crate::trips::ReplyMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "TRIPCHAT_BACKEND_URL";

const DEFAULT_CONFIG_TOML: &str = include_str!("../config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL; requests go to `<url>/trips`
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub mode: ReplyMode,
    /// Seeded as the first system message; empty log when absent
    pub welcome_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    pub keep_recordings: bool,
    /// Where kept recordings go (None = default data directory)
    pub directory: Option<PathBuf>,
}

/// User config file: every section and key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    backend: BackendFile,
    chat: ChatFile,
    recording: RecordingFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendFile {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatFile {
    mode: Option<ReplyMode>,
    welcome_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordingFile {
    keep_recordings: Option<bool>,
    directory: Option<PathBuf>,
}

/// Get the user config file path
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("TripChat").join("config.toml"))
}

impl Config {
    /// Load defaults, the user file and environment overrides
    ///
    /// An explicit `path` must exist; the default user file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config: Config = toml::from_str(DEFAULT_CONFIG_TOML)?;

        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(path) = user_config_path().filter(|p| p.exists()) {
                    config.merge_file(&path)?;
                }
            }
        }

        if let Ok(url) = std::env::var(BACKEND_URL_ENV) {
            if url.trim().is_empty() {
                warn!("{} is set but empty, ignoring", BACKEND_URL_ENV);
            } else {
                config.backend.url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<(), AppError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.merge_str(&contents)?;
        info!("Loaded configuration from: {:?}", path);
        Ok(())
    }

    /// Layer a (possibly partial) TOML document over this config
    pub fn merge_str(&mut self, contents: &str) -> Result<(), AppError> {
        let file: ConfigFile = toml::from_str(contents)?;

        if let Some(url) = file.backend.url {
            self.backend.url = url;
        }
        if let Some(timeout) = file.backend.timeout_secs {
            self.backend.timeout_secs = timeout;
        }
        if let Some(mode) = file.chat.mode {
            self.chat.mode = mode;
        }
        if let Some(welcome) = file.chat.welcome_message {
            self.chat.welcome_message = Some(welcome).filter(|w| !w.trim().is_empty());
        }
        if let Some(keep) = file.recording.keep_recordings {
            self.recording.keep_recordings = keep;
        }
        if file.recording.directory.is_some() {
            self.recording.directory = file.recording.directory;
        }
        Ok(())
    }

    /// Validate the configuration and return the parsed backend URL
    pub fn validate(&self) -> Result<Url, AppError> {
        let url = Url::parse(&self.backend.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "backend URL must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(AppError::Config(
                "backend timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Directory for kept recordings, or None when recordings are not kept
    pub fn recordings_dir(&self) -> Option<PathBuf> {
        if !self.recording.keep_recordings {
            return None;
        }
        self.recording
            .directory
            .clone()
            .or_else(storage::default_recordings_dir)
    }
}
