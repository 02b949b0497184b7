//! Conversation message types

use crate::itinerary::Journey;
use crate::recording::AudioClip;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    System,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "You"),
            Sender::System => write!(f, "Planner"),
        }
    }
}

/// Content of a message
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text { content: String },
    Audio { clip: Arc<AudioClip> },
    Itinerary { journey: Journey },
    Error { message: String },
}

/// One entry of the conversation log
///
/// Messages are immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Insertion index in the log
    pub id: u64,
    pub sender: Sender,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error { .. })
    }

    /// Text content, for text and error payloads
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text { content } => Some(content),
            Payload::Error { message } => Some(message),
            _ => None,
        }
    }
}
