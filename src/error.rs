// Error types shared by the ingestion pipeline and the player
// Each layer gets its own enum; the UI only ever sees IngestError

use thiserror::Error;

// ==========================================
// TRANSPORT ERRORS
// ==========================================
// Raised by the HTTP client talking to the YouTube Data API.
// A server-reported error object is NOT an ApiError: the body still parses,
// and the caller inspects its `error` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

// ==========================================
// INGESTION ERRORS
// ==========================================
// The three categories a playlist load can end in.
// All of them clear the loaded playlist and the active selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    // No `list=` token could be pulled out of the link (no request was made)
    #[error("no playlist identifier in link")]
    InvalidReference,

    // The listing finished without a single usable video
    #[error("playlist contains no videos")]
    EmptyResult,

    // Server-reported error, transport failure, or unexpected response shape
    #[error("fetch failed: {0}")]
    FetchFailure(String),
}

impl IngestError {
    // Message shown to the user in the playlist pane
    pub fn user_message(&self) -> &'static str {
        match self {
            IngestError::InvalidReference => {
                "Invalid playlist link. Make sure it includes '&list=...'"
            }
            IngestError::EmptyResult => "No videos found in this playlist.",
            IngestError::FetchFailure(_) => {
                "Failed to fetch. Check API key, privacy settings, or if playlist is empty."
            }
        }
    }
}

impl From<ApiError> for IngestError {
    fn from(err: ApiError) -> Self {
        IngestError::FetchFailure(err.to_string())
    }
}

// ==========================================
// PLAYER HANDLE ERRORS
// ==========================================
// Creating an external player can fail (yt-dlp missing, no audio device).
// These are logged by the controller and never reach the user as ingestion errors.
#[derive(Debug, Error)]
pub enum HandleError {
    #[error("yt-dlp failed: {0}")]
    Extractor(String),

    #[error("Failed to start player thread: {0}")]
    Spawn(String),
}
