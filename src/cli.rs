//! Command-line interface definition
//!
//! Flags here override the configuration file.

use crate::config::Config;
use crate::trips::ReplyMode;
use clap::Parser;
use std::path::PathBuf;

/// TripChat - talk to the trip planner by text or voice
#[derive(Parser, Debug, Clone)]
#[command(name = "tripchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the trip planner backend
    #[arg(short, long)]
    pub backend_url: Option<String>,

    /// Reply mode: itinerary or plain-text
    #[arg(short, long, value_enum)]
    pub mode: Option<ReplyMode>,

    /// Request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Start with an empty conversation instead of the welcome message
    #[arg(long)]
    pub no_welcome: bool,

    /// Keep a copy of every recording on disk
    #[arg(long)]
    pub keep_recordings: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command-line overrides to a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.backend_url {
            config.backend.url = url.clone();
        }
        if let Some(mode) = self.mode {
            config.chat.mode = mode;
        }
        if let Some(timeout) = self.timeout {
            config.backend.timeout_secs = timeout;
        }
        if self.no_welcome {
            config.chat.welcome_message = None;
        }
        if self.keep_recordings {
            config.recording.keep_recordings = true;
        }
    }
}
