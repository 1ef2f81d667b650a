// Runtime configuration
// Command line flags with environment fallbacks, plus the directories the
// player writes to (audio cache, log file)

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::youtube::api::DEFAULT_API_BASE;

const APP_DIR_NAME: &str = "playlist-player";

#[derive(Debug, Parser)]
#[command(name = "playlist-player", version, about = "Play a YouTube playlist from the terminal")]
pub struct Args {
    /// YouTube Data API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the YouTube Data API
    #[arg(long, env = "YOUTUBE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Minimum spacing between API requests, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub request_interval_ms: u64,

    /// Start with autoplay switched off
    #[arg(long)]
    pub no_autoplay: bool,

    /// Directory for the log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Directory for downloaded audio
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// yt-dlp executable used to fetch audio
    #[arg(long = "yt-dlp", env = "YT_DLP_PATH", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// Playlist link to load on startup
    #[arg(value_name = "PLAYLIST_URL")]
    pub link: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_base: String,
    pub request_interval: Duration,
    pub autoplay: bool,
    pub log_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub yt_dlp: PathBuf,
    pub initial_link: Option<String>,
}

impl Config {
    // Resolves directories and creates them if needed.
    // A missing API key is not an error here: requests go out with an empty
    // key and the server's rejection surfaces as a fetch failure.
    pub fn from_args(args: Args) -> Result<Self, String> {
        let log_dir = match args.log_dir {
            Some(dir) => dir,
            None => dirs::data_local_dir()
                .ok_or("Could not find local data directory")?
                .join(APP_DIR_NAME),
        };

        let cache_dir = match args.cache_dir {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or("Could not find cache directory")?
                .join(APP_DIR_NAME)
                .join("audio"),
        };

        for dir in [&log_dir, &cache_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }

        Ok(Config {
            api_key: args.api_key.unwrap_or_default(),
            api_base: args.api_base,
            request_interval: Duration::from_millis(args.request_interval_ms),
            autoplay: !args.no_autoplay,
            log_dir,
            cache_dir,
            yt_dlp: args.yt_dlp,
            initial_link: args.link,
        })
    }

    #[cfg(test)]
    pub fn for_tests(api_base: &str) -> Self {
        let scratch = std::env::temp_dir().join(APP_DIR_NAME);
        Config {
            api_key: "test-key".to_string(),
            api_base: api_base.to_string(),
            request_interval: Duration::ZERO,
            autoplay: true,
            log_dir: scratch.clone(),
            cache_dir: scratch,
            yt_dlp: PathBuf::from("yt-dlp"),
            initial_link: None,
        }
    }
}
