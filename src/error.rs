use crate::audio::AudioCaptureError;
use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[source] reqwest::Error),
}

/// Trip request errors
///
/// None of these reach the message log: they are logged and the exchange ends.
/// A backend-reported error is not an error here, it is a
/// [`crate::trips::ConversationReply::Error`].
#[derive(Debug, Error)]
pub enum TripRequestError {
    #[error("A trip request is already in flight")]
    Busy,

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response from server: {0}")]
    MalformedResponse(String),
}

impl TripRequestError {
    /// Whether the request failed before a usable response arrived
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TripRequestError::Transport(_) | TripRequestError::Status { .. }
        )
    }
}

/// Recording errors
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("Microphone unavailable: {0}")]
    DeviceUnavailable(#[from] AudioCaptureError),
}
