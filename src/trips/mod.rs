//! Trip planner client
//!
//! Sends a user request (recorded clip or typed text) to `POST /trips` and
//! maps the reply into a [`ConversationReply`]. At most one request is in
//! flight at a time; the slot is claimed on the [`MessageStore`] busy gate.

mod response;

pub use response::{ConversationReply, ReplyMode};

use crate::conversation::MessageStore;
use crate::error::{AppError, TripRequestError};
use crate::recording::AudioClip;
use reqwest::multipart::{Form, Part};
use response::TripResponse;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Multipart field carrying the recorded clip
pub const AUDIO_FIELD: &str = "audio_file";

/// Path of the planner endpoint, relative to the backend base URL
const TRIPS_PATH: &str = "trips";

/// Connect timeout for the planner backend
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A request to the trip planner
#[derive(Debug, Clone)]
pub enum TripInput {
    Audio(Arc<AudioClip>),
    Text(String),
}

impl TripInput {
    fn kind(&self) -> &'static str {
        match self {
            TripInput::Audio(_) => "audio",
            TripInput::Text(_) => "text",
        }
    }
}

/// JSON body for typed queries
#[derive(Debug, Serialize)]
struct TextQuery<'a> {
    message: &'a str,
}

/// Client for the trip planner backend
pub struct TripRequestClient {
    endpoint: Url,
    mode: ReplyMode,
    client: reqwest::Client,
}

impl TripRequestClient {
    /// Create a client for the backend at `base_url`
    ///
    /// `timeout` bounds the whole request so a stalled planner cannot keep the
    /// conversation busy forever.
    pub fn new(base_url: &Url, mode: ReplyMode, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(AppError::Http)?;

        Ok(Self {
            endpoint: trips_endpoint(base_url)?,
            mode,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit one request and wait for the planner's reply
    ///
    /// Refused with [`TripRequestError::Busy`] while another request holds the
    /// store's busy gate; no network call is made in that case. Busy is set for
    /// the whole call and reset on every exit path.
    #[instrument(skip(self, store, input), fields(kind = input.kind(), mode = %self.mode))]
    pub async fn submit(
        &self,
        store: &MessageStore,
        input: TripInput,
    ) -> Result<ConversationReply, TripRequestError> {
        let _busy = store.begin_request().ok_or(TripRequestError::Busy)?;

        let request = match &input {
            TripInput::Audio(clip) => {
                let part = Part::bytes(clip.data.clone())
                    .file_name(clip.file_name())
                    .mime_str(&clip.content_type)?;
                debug!(
                    clip_id = clip.id,
                    bytes = clip.data.len(),
                    "Uploading recorded clip"
                );
                self.client
                    .post(self.endpoint.clone())
                    .multipart(Form::new().part(AUDIO_FIELD, part))
            }
            TripInput::Text(text) => self
                .client
                .post(self.endpoint.clone())
                .header("Content-Type", "application/json")
                .json(&TextQuery {
                    message: text.trim(),
                }),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TripRequestError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: TripResponse = serde_json::from_slice(&body).map_err(|e| {
            TripRequestError::MalformedResponse(format!("Failed to parse planner response: {}", e))
        })?;

        let reply = parsed.into_reply(self.mode).ok_or_else(|| {
            TripRequestError::MalformedResponse(format!(
                "response has neither an error nor a {} reply",
                self.mode
            ))
        })?;

        info!(status = status.as_u16(), "Planner replied");
        Ok(reply)
    }
}

/// Resolve `<base>/trips`, keeping any path prefix of the base URL
fn trips_endpoint(base_url: &Url) -> Result<Url, url::ParseError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(TRIPS_PATH)
}
