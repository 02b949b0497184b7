//! Conversation engine: message log, busy gate and the controller that
//! connects user actions to the trip planner.

mod controller;
mod message;
mod store;

pub use controller::{ChatController, Dispatch};
pub use message::{Message, Payload, Sender};
pub use store::{BusyGuard, ConversationEvent, ConversationState, MessageStore};
