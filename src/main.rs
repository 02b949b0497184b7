#![deny(clippy::all)]

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tripchat::audio::MicrophoneInput;
use tripchat::cli::Cli;
use tripchat::config::Config;
use tripchat::conversation::{ChatController, MessageStore};
use tripchat::repl;
use tripchat::trips::TripRequestClient;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so they stay out of the chat transcript
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Single-threaded: the UI loop and all requests share one event loop
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    // Load .env before config so it can override the backend URL
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    let backend_url = config.validate()?;

    let client = TripRequestClient::new(&backend_url, config.chat.mode, config.request_timeout())?;
    info!(
        "Trip planner at {} (mode: {}, timeout: {}s)",
        client.endpoint(),
        config.chat.mode,
        config.backend.timeout_secs
    );

    let store = Arc::new(MessageStore::with_welcome(
        config.chat.welcome_message.as_deref(),
    ));
    let controller = ChatController::new(store, client, Arc::new(MicrophoneInput))
        .with_recordings_dir(config.recordings_dir());

    repl::run(Arc::new(controller)).await
}
