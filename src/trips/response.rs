//! Trip planner response decoding
//!
//! Maps the planner's JSON body onto a [`ConversationReply`] according to the
//! configured [`ReplyMode`].

use crate::itinerary::Journey;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Which success field of the response is honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyMode {
    /// Replies carry an itinerary string (`itineraire`)
    #[default]
    Itinerary,
    /// Replies carry a plain transcription or message (`text`)
    PlainText,
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyMode::Itinerary => write!(f, "itinerary"),
            ReplyMode::PlainText => write!(f, "plain-text"),
        }
    }
}

/// Reply content destined for a system message
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationReply {
    Text(String),
    Itinerary(Journey),
    /// The planner reported an error; shown to the user
    Error(String),
}

/// Body returned by `POST /trips`
///
/// Unknown fields are ignored. Known fields holding something other than a
/// string are treated as absent, except `error`, which is kept as its JSON
/// text so it still takes precedence.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TripResponse {
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) itineraire: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) duree: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) next_dep_time: Option<String>,
    #[serde(default, deserialize_with = "error_text")]
    pub(crate) error: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) text: Option<String>,
    /// Audio path of the planner names the transcript this way
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) transcription: Option<String>,
    /// Text path of the planner puts its processed phrases here, often as a
    /// list or null
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) message: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn error_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl TripResponse {
    /// Interpret the body; `None` when it carries nothing usable for `mode`
    ///
    /// `error` always wins over any success field.
    pub(crate) fn into_reply(self, mode: ReplyMode) -> Option<ConversationReply> {
        if let Some(error) = self.error {
            return Some(ConversationReply::Error(error));
        }

        match mode {
            ReplyMode::Itinerary => self.itineraire.map(|raw| {
                ConversationReply::Itinerary(Journey::from_parts(
                    &raw,
                    self.duree.as_deref(),
                    self.next_dep_time.as_deref(),
                ))
            }),
            ReplyMode::PlainText => self
                .text
                .or(self.transcription)
                .or(self.message)
                .map(ConversationReply::Text),
        }
    }
}
