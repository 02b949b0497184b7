//! Interactive chat loop
//!
//! Lines are read on a blocking thread and handed to the async loop, which
//! dispatches them to the controller. Requests run as spawned tasks so the
//! loop keeps draining microphone fragments while one is in flight.

use crate::conversation::{ChatController, Dispatch};
use crate::render;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

const PROMPT: &str = "> ";
const STILL_WAITING: &str = "Still waiting for the planner, try again shortly.";

/// How often captured fragments are pulled into the recording session
const FRAGMENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    Record,
    Stop,
    History,
    Help,
    Quit,
    Unknown(String),
    Nothing,
}

/// Parse one input line
pub fn parse_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Nothing;
    }
    if !trimmed.starts_with('/') {
        return ReplCommand::Send(trimmed.to_string());
    }

    match trimmed.to_lowercase().as_str() {
        "/record" | "/rec" => ReplCommand::Record,
        "/stop" => ReplCommand::Stop,
        "/history" => ReplCommand::History,
        "/help" | "/?" => ReplCommand::Help,
        "/quit" | "/exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  <text>      ask the planner");
    println!("  /record     start a voice request");
    println!("  /stop       stop recording and send it");
    println!("  /history    show the conversation");
    println!("  /help       show this help");
    println!("  /quit       leave");
    println!();
}

enum InputLine {
    Line(String),
    Closed,
}

/// Read lines on a dedicated thread until end of input
fn spawn_reader(tx: mpsc::UnboundedSender<InputLine>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    std::thread::spawn(move || loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    if let Err(e) = rl.add_history_entry(trimmed) {
                        debug!("Failed to add history entry: {}", e);
                    }
                }
                if tx.send(InputLine::Line(line)).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.send(InputLine::Closed);
                break;
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                let _ = tx.send(InputLine::Closed);
                break;
            }
        }
    });
    Ok(())
}

/// Run the chat until the user quits
pub async fn run(controller: Arc<ChatController>) -> Result<()> {
    let store = controller.store().clone();

    println!("{}", "TripChat".bold().cyan());
    println!("Type where you want to go, or /help for commands.\n");
    render::print_snapshot(&store.snapshot());
    let _renderer = render::spawn_event_handler(store.subscribe());

    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    spawn_reader(line_tx)?;

    let mut poll = tokio::time::interval(FRAGMENT_POLL_INTERVAL);

    loop {
        tokio::select! {
            input = line_rx.recv() => {
                let line = match input {
                    Some(InputLine::Line(line)) => line,
                    Some(InputLine::Closed) | None => break,
                };
                if !handle_line(&controller, &line) {
                    break;
                }
            }
            _ = poll.tick() => {
                controller.poll_recording();
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Notice for a finished action whose outcome would otherwise go unseen
fn dispatch_notice(outcome: Dispatch, voice: bool) -> Option<&'static str> {
    match outcome {
        Dispatch::Busy if voice => {
            Some("Recording kept, but the planner is still busy. Record again to resend.")
        }
        Dispatch::Busy => Some(STILL_WAITING),
        Dispatch::Empty if voice => Some("Not recording."),
        Dispatch::Empty | Dispatch::Completed { .. } => None,
    }
}

/// Handle one line; returns false when the loop should end
fn handle_line(controller: &Arc<ChatController>, line: &str) -> bool {
    match parse_command(line) {
        ReplCommand::Nothing => {}
        ReplCommand::Send(text) => {
            if controller.store().is_busy() {
                println!("{}", STILL_WAITING.yellow());
                return true;
            }
            let controller = controller.clone();
            tokio::spawn(async move {
                let outcome = controller.send_text(&text).await;
                if let Some(notice) = dispatch_notice(outcome, false) {
                    println!("{}", notice.yellow());
                }
                debug!(?outcome, "Text request finished");
            });
        }
        ReplCommand::Record => {
            let controller = controller.clone();
            tokio::spawn(async move {
                if controller.start_recording().await {
                    println!("{}", "Recording... type /stop to send.".red().bold());
                } else if controller.store().is_busy() {
                    println!("{}", STILL_WAITING.yellow());
                } else {
                    println!("{}", "Microphone unavailable.".yellow());
                }
            });
        }
        ReplCommand::Stop => {
            let controller = controller.clone();
            tokio::spawn(async move {
                let outcome = controller.stop_recording().await;
                if let Some(notice) = dispatch_notice(outcome, true) {
                    println!("{}", notice.yellow());
                }
                debug!(?outcome, "Voice request finished");
            });
        }
        ReplCommand::History => render::print_snapshot(&controller.store().snapshot()),
        ReplCommand::Help => print_help(),
        ReplCommand::Quit => return false,
        ReplCommand::Unknown(command) => {
            println!("{} {}", "Unknown command:".yellow(), command);
            print_help();
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text() {
        assert_eq!(
            parse_command("  Paris to Lyon tomorrow "),
            ReplCommand::Send("Paris to Lyon tomorrow".to_string())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/record"), ReplCommand::Record);
        assert_eq!(parse_command("/REC"), ReplCommand::Record);
        assert_eq!(parse_command("/stop"), ReplCommand::Stop);
        assert_eq!(parse_command("/history"), ReplCommand::History);
        assert_eq!(parse_command("/help"), ReplCommand::Help);
        assert_eq!(parse_command("/exit"), ReplCommand::Quit);
        assert_eq!(parse_command("/quit"), ReplCommand::Quit);
    }

    #[test]
    fn test_refused_requests_get_a_notice() {
        assert_eq!(dispatch_notice(Dispatch::Busy, false), Some(STILL_WAITING));
        assert!(dispatch_notice(Dispatch::Busy, true)
            .unwrap()
            .starts_with("Recording kept"));
        assert_eq!(dispatch_notice(Dispatch::Empty, true), Some("Not recording."));
    }

    #[test]
    fn test_completed_requests_are_quiet() {
        assert_eq!(dispatch_notice(Dispatch::Completed { replied: true }, false), None);
        assert_eq!(dispatch_notice(Dispatch::Completed { replied: false }, true), None);
        assert_eq!(dispatch_notice(Dispatch::Empty, false), None);
    }

    #[test]
    fn test_parse_blank_and_unknown() {
        assert_eq!(parse_command("   "), ReplCommand::Nothing);
        assert_eq!(
            parse_command("/teleport"),
            ReplCommand::Unknown("/teleport".to_string())
        );
    }
}
