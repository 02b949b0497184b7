//! Terminal rendering of the conversation
//!
//! Subscribes to store events and prints each appended message as a chat
//! bubble. The renderer only reads what the conversation engine produces.

use crate::conversation::{ConversationEvent, ConversationState, Message, Payload, Sender};
use crate::recording::AudioClip;
use colored::Colorize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Event handler loop that prints conversation events
#[tracing::instrument(skip(event_rx))]
async fn run_event_handler(mut event_rx: broadcast::Receiver<ConversationEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => handle_event(&event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Renderer fell behind, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Spawn the renderer task
pub fn spawn_event_handler(event_rx: broadcast::Receiver<ConversationEvent>) -> JoinHandle<()> {
    tokio::spawn(run_event_handler(event_rx))
}

fn handle_event(event: &ConversationEvent) {
    match event {
        ConversationEvent::MessageAppended(message) => {
            println!("{}\n", format_message(message));
        }
        ConversationEvent::BusyChanged(true) => {
            println!("{}", "… waiting for the planner".dimmed());
        }
        ConversationEvent::BusyChanged(false) => {}
    }
}

/// Print the whole conversation
pub fn print_snapshot(state: &ConversationState) {
    for message in &state.messages {
        println!("{}\n", format_message(message));
    }
    if state.busy {
        println!("{}", "… waiting for the planner".dimmed());
    }
}

/// Format one message as a multi-line chat bubble
pub fn format_message(message: &Message) -> String {
    let label = match message.sender {
        Sender::User => format!("{}:", message.sender).blue().bold(),
        Sender::System => format!("{}:", message.sender).green().bold(),
    };
    let time = message
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string()
        .dimmed();

    let body = match &message.payload {
        Payload::Text { content } => content.clone(),
        Payload::Audio { clip } => format_clip(clip),
        Payload::Itinerary { journey } => {
            let stops = if journey.is_direct() {
                "direct".to_string()
            } else {
                journey.intermediate_stops.join(", ")
            };
            format!(
                "{}\n  Departure:      {}\n  Stops:          {}\n  Arrival:        {}\n  Duration:       {}\n  Next departure: {}",
                journey,
                journey.departure,
                stops,
                journey.arrival,
                journey.duration,
                journey.next_departure
            )
        }
        Payload::Error { message } => format!("{} {}", "error:".red().bold(), message.red()),
    };

    format!("{} {} {}", time, label, body)
}

fn format_clip(clip: &AudioClip) -> String {
    let mut line = format!(
        "[voice request, {:.1} s, {} KB]",
        clip.duration().as_secs_f64(),
        clip.data.len().div_ceil(1024)
    );
    if let Some(path) = &clip.saved_path {
        line.push_str(&format!(" saved to {}", path.display()));
    }
    line
}
