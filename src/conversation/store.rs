//! Append-only conversation log with the request busy gate

use super::message::{Message, Payload, Sender};
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Change notification for renderers
#[derive(Debug, Clone)]
pub enum ConversationEvent {
    MessageAppended(Message),
    BusyChanged(bool),
}

/// Ordered message log plus the request-in-flight flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub busy: bool,
}

/// Owner of the conversation state
///
/// Messages are only ever appended; none is removed or reordered.
pub struct MessageStore {
    state: Mutex<ConversationState>,
    event_tx: broadcast::Sender<ConversationEvent>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Mutex::new(ConversationState::default()),
            event_tx,
        }
    }

    /// Create a store seeded with a system welcome message
    pub fn with_welcome(welcome: Option<&str>) -> Self {
        let store = Self::new();
        if let Some(text) = welcome.map(str::trim).filter(|text| !text.is_empty()) {
            store.append(
                Sender::System,
                Payload::Text {
                    content: text.to_string(),
                },
            );
        }
        store
    }

    /// Subscribe to appended messages and busy changes
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.event_tx.subscribe()
    }

    /// Append a message to the end of the log
    pub fn append(&self, sender: Sender, payload: Payload) -> Message {
        let message = {
            let mut state = self.lock();
            let message = Message {
                id: state.messages.len() as u64,
                sender,
                payload,
                timestamp: Utc::now(),
            };
            state.messages.push(message.clone());
            message
        };
        debug!(id = message.id, sender = %message.sender, "Message appended");
        let _ = self
            .event_tx
            .send(ConversationEvent::MessageAppended(message.clone()));
        message
    }

    pub fn set_busy(&self, busy: bool) {
        let changed = {
            let mut state = self.lock();
            let changed = state.busy != busy;
            state.busy = busy;
            changed
        };
        if changed {
            let _ = self.event_tx.send(ConversationEvent::BusyChanged(busy));
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Claim the single request slot
    ///
    /// Returns `None` if a request is already in flight. Busy is reset when
    /// the returned guard is dropped.
    pub fn begin_request(&self) -> Option<BusyGuard<'_>> {
        {
            let mut state = self.lock();
            if state.busy {
                return None;
            }
            state.busy = true;
        }
        let _ = self.event_tx.send(ConversationEvent::BusyChanged(true));
        Some(BusyGuard { store: self })
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the ordered log and busy flag for rendering
    pub fn snapshot(&self) -> ConversationState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => {
                warn!("Conversation mutex was poisoned, recovering data");
                poisoned.into_inner()
            }
        }
    }
}

/// Holds the request slot of a [`MessageStore`]
#[must_use = "the request slot is released as soon as the guard is dropped"]
pub struct BusyGuard<'a> {
    store: &'a MessageStore,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.store.set_busy(false);
    }
}
