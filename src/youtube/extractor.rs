// YouTube audio extractor
// Runs yt-dlp as a child process to pull a video's audio track into the local
// cache. A running download can be abandoned; the child is killed and its
// partial files removed.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::HandleError;

const AUDIO_FORMAT: &str = "mp3";
const DEFAULT_PROGRAM: &str = "yt-dlp";

// How often a running download is checked for exit or cancellation
const FETCH_POLL: Duration = Duration::from_millis(100);

// Each download writes under its own name and is renamed into place once
// complete, so two fetches of the same video never share a file
static NEXT_DOWNLOAD: AtomicU64 = AtomicU64::new(0);

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

// Video ids are 11 URL-safe base64 characters; anything else would end up
// in a file name and a command line, so it is refused
fn is_valid_video_id(video_id: &str) -> bool {
    !video_id.is_empty()
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Ready(PathBuf),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct YouTubeExtractor {
    cache_dir: PathBuf,
    program: PathBuf,
}

impl YouTubeExtractor {
    pub fn new(cache_dir: PathBuf) -> Self {
        YouTubeExtractor {
            cache_dir,
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }

    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn cached_path(&self, video_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", video_id, AUDIO_FORMAT))
    }

    // ==========================================
    // fetch_audio()
    // ==========================================
    // Blocking: call from a dedicated thread, not from the async runtime.
    //
    // 1. cache hit → Ready right away, no process started
    // 2. spawn yt-dlp writing to a private ".partial-<id>-<n>" name
    // 3. poll until it exits, asking `cancelled` between polls
    // 4. cancelled → kill, reap, delete partial files → Cancelled
    // 5. success → rename into the cache → Ready
    pub fn fetch_audio<F>(&self, video_id: &str, mut cancelled: F) -> Result<Fetched, HandleError>
    where
        F: FnMut() -> bool,
    {
        if !is_valid_video_id(video_id) {
            return Err(HandleError::Extractor(format!("invalid video id {:?}", video_id)));
        }

        let target = self.cached_path(video_id);
        if target.exists() {
            debug!(video_id = %video_id, "Audio already cached");
            return Ok(Fetched::Ready(target));
        }

        let stem = format!(
            ".partial-{}-{}",
            video_id,
            NEXT_DOWNLOAD.fetch_add(1, Ordering::Relaxed)
        );
        let template = self.cache_dir.join(format!("{}.%(ext)s", stem));
        let finished = self.cache_dir.join(format!("{}.{}", stem, AUDIO_FORMAT));
        debug!(video_id = %video_id, program = %self.program.display(), "Fetching audio");

        let mut child = Command::new(&self.program)
            .arg("--no-playlist")
            .arg("-f")
            .arg("bestaudio/best")
            .arg("-x")
            .arg("--audio-format")
            .arg(AUDIO_FORMAT)
            .arg("-o")
            .arg(&template)
            .arg(watch_url(video_id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                HandleError::Extractor(format!("Failed to run yt-dlp: {}. Is yt-dlp installed?", e))
            })?;

        // Read on the side so a chatty child never stalls on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    self.remove_partials(&stem);
                    return Err(HandleError::Extractor(format!("Lost track of yt-dlp: {}", e)));
                }
            }

            if cancelled() {
                if let Err(e) = child.kill() {
                    debug!(video_id = %video_id, error = %e, "yt-dlp already gone");
                }
                let _ = child.wait();
                self.remove_partials(&stem);
                debug!(video_id = %video_id, "Audio fetch abandoned");
                return Ok(Fetched::Cancelled);
            }

            thread::sleep(FETCH_POLL);
        };

        if !status.success() {
            self.remove_partials(&stem);
            let stderr = stderr_reader
                .and_then(|reader| reader.join().ok())
                .unwrap_or_default();
            return Err(HandleError::Extractor(stderr.trim().to_string()));
        }

        if !finished.exists() {
            self.remove_partials(&stem);
            return Err(HandleError::Extractor(format!(
                "yt-dlp finished but {} is missing",
                finished.display()
            )));
        }

        fs::rename(&finished, &target).map_err(|e| {
            HandleError::Extractor(format!("Failed to move audio into the cache: {}", e))
        })?;
        self.remove_partials(&stem);

        Ok(Fetched::Ready(target))
    }

    // Deletes everything a download named `stem` left behind
    fn remove_partials(&self, stem: &str) {
        let prefix = format!("{}.", stem);
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return;
        };

        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(path = %entry.path().display(), error = %e, "Could not remove partial download");
                }
            }
        }
    }
}
