// Main entry point for the YouTube playlist player
// Parses configuration, sets up file logging, then hands over to the TUI

mod config;
mod error;
mod player;
mod ui;
mod youtube;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{Args, Config};
use ui::app::PlaylistPlayerApp;

const LOG_FILE_NAME: &str = "player.log";

// Logs go to a file: the terminal is owned by the TUI
fn init_logging(config: &Config) {
    let appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE_NAME);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(appender)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep ALSA buffer warnings out of the TUI
    std::env::set_var("ALSA_PCM_NO_MMAP", "1");

    let args = Args::parse();
    let config = Config::from_args(args).map_err(|e| anyhow!(e))?;

    init_logging(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting playlist player");

    if config.api_key.is_empty() {
        tracing::warn!("No API key configured (set YOUTUBE_API_KEY); playlist loads will fail");
    }

    let mut app = PlaylistPlayerApp::new(&config).context("Failed to initialize player")?;
    app.run().await?;

    tracing::info!("Playlist player exited");
    Ok(())
}
