// YouTube Data API v3 client
// Three endpoints are used: playlistItems (paged listing), videos (durations)
// and playlists (title). Everything above this module talks to the
// PlaylistApi trait so tests can swap in an in-memory fake.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

// Server-side ceiling for both maxResults and ids-per-request
pub const MAX_PAGE_SIZE: usize = 50;

const USER_AGENT: &str = concat!("playlist-player/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ==========================================
// WIRE MODEL
// ==========================================
// Every field is optional: the API omits whole objects for deleted/private
// videos and the pipeline filters those records itself.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Option<Vec<PlaylistItemResource>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemResource {
    #[serde(default)]
    pub snippet: Option<ItemSnippet>,
    #[serde(default)]
    pub content_details: Option<ItemContentDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContentDetails {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Option<Vec<VideoResource>>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResource {
    pub id: String,
    #[serde(default)]
    pub content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoContentDetails {
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistListResponse {
    #[serde(default)]
    pub items: Option<Vec<PlaylistResource>>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistResource {
    #[serde(default)]
    pub snippet: Option<PlaylistSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistSnippet {
    #[serde(default)]
    pub title: Option<String>,
}

// ==========================================
// PlaylistApi TRAIT
// ==========================================
// The three requests the ingestion pipeline needs.
// Implementations return the parsed body even when it carries an `error`
// object; only transport and parse failures are Err.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    // One page of the listing (at most MAX_PAGE_SIZE records)
    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, ApiError>;

    // Duration details for up to MAX_PAGE_SIZE video ids
    async fn video_details(&self, video_ids: &[String]) -> Result<VideoListResponse, ApiError>;

    // Playlist-level metadata (title)
    async fn playlist_details(&self, playlist_id: &str) -> Result<PlaylistListResponse, ApiError>;
}

// ==========================================
// RATE LIMITER
// ==========================================
// Keeps a minimum gap between consecutive requests.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ==========================================
// HTTP CLIENT
// ==========================================
pub struct YouTubeDataClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl YouTubeDataClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            rate_limiter: RateLimiter::new(config.request_interval),
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    // Issues a GET and parses the body as JSON whatever the status code.
    // The API reports quota/key/privacy problems as a JSON error object on a
    // 4xx, and callers want that message. A non-JSON body on a failed status
    // is reported as a status error instead.
    async fn get_json<T>(&self, resource: &str, query: &[(&str, &str)]) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.rate_limiter.wait().await;

        let url = self.endpoint(resource);
        debug!(url = %url, params = query.len(), "Querying YouTube Data API");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ApiError::Status(status.as_u16(), body)),
            Err(e) => Err(ApiError::Parse(e.to_string())),
        }
    }
}

#[async_trait]
impl PlaylistApi for YouTubeDataClient {
    async fn playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, ApiError> {
        let max_results = MAX_PAGE_SIZE.to_string();
        self.get_json(
            "playlistItems",
            &[
                ("part", "snippet,contentDetails"),
                ("maxResults", max_results.as_str()),
                ("playlistId", playlist_id),
                ("pageToken", page_token.unwrap_or("")),
            ],
        )
        .await
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<VideoListResponse, ApiError> {
        let ids = video_ids.join(",");
        self.get_json("videos", &[("part", "contentDetails"), ("id", ids.as_str())])
            .await
    }

    async fn playlist_details(&self, playlist_id: &str) -> Result<PlaylistListResponse, ApiError> {
        self.get_json("playlists", &[("part", "snippet"), ("id", playlist_id)])
            .await
    }
}
