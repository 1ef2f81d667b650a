// Playlist ingestion
// Turns a pasted link into a complete Playlist: listing, durations, title

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::player::playlist::{Playlist, PlaylistItem};
use crate::youtube::api::PlaylistApi;
use crate::youtube::duration::DEFAULT_DURATION;
use crate::youtube::enrich::fetch_durations;
use crate::youtube::link::extract_playlist_id;
use crate::youtube::pages::{fetch_all_snippets, VideoSnippet};

pub const PLACEHOLDER_PLAYLIST_TITLE: &str = "Unknown Playlist";

// Result of one ingestion, stamped with the generation it was started under
#[derive(Debug)]
pub struct IngestOutcome {
    pub generation: u64,
    pub result: Result<Playlist, IngestError>,
}

// ==========================================
// INGESTOR
// ==========================================
// Owns the API client and the generation counter.
//
// Every load calls begin() first and gets a new generation number. When the
// result comes back, accept() only hands it over if no newer load has been
// started in the meantime; older results are dropped without touching state.
pub struct Ingestor<A: PlaylistApi> {
    api: A,
    generation: AtomicU64,
}

impl<A: PlaylistApi> Ingestor<A> {
    pub fn new(api: A) -> Self {
        Ingestor {
            api,
            generation: AtomicU64::new(0),
        }
    }

    // Starts a new generation, superseding any load still in flight
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // Unwraps an outcome if it belongs to the latest generation
    pub fn accept(&self, outcome: IngestOutcome) -> Option<Result<Playlist, IngestError>> {
        if self.is_current(outcome.generation) {
            Some(outcome.result)
        } else {
            debug!(generation = outcome.generation, "Discarding result of a superseded load");
            None
        }
    }

    // Starts a load in the background. The generation is taken before the
    // task is spawned, so loads are ordered by when they were requested.
    pub fn spawn_load(self: &Arc<Self>, link: String, tx: mpsc::UnboundedSender<IngestOutcome>) -> u64
    where
        A: 'static,
    {
        let generation = self.begin();
        let ingestor = Arc::clone(self);
        tokio::spawn(async move {
            let result = ingestor.ingest(&link).await;
            if tx.send(IngestOutcome { generation, result }).is_err() {
                debug!(generation, "Load finished after the receiver closed");
            }
        });
        generation
    }

    // ==========================================
    // ingest()
    // ==========================================
    // Steps:
    // 1. pull the playlist id out of the link (InvalidReference, no request)
    // 2. fetch every listing page (FetchFailure on server error)
    // 3. nothing usable → EmptyResult
    // 4. fetch durations in batches (never fails)
    // 5. merge and number items 1..=n
    // 6. fetch the title (placeholder on any failure)
    pub async fn ingest(&self, link: &str) -> Result<Playlist, IngestError> {
        let playlist_id = extract_playlist_id(link).ok_or(IngestError::InvalidReference)?;
        info!(playlist_id = %playlist_id, "Loading playlist");

        let snippets = fetch_all_snippets(&self.api, &playlist_id).await?;
        if snippets.is_empty() {
            return Err(IngestError::EmptyResult);
        }

        let video_ids: Vec<String> = snippets.iter().map(|s| s.video_id.clone()).collect();
        let durations = fetch_durations(&self.api, &video_ids).await;
        let items = merge_items(snippets, &durations);

        let title = self.playlist_title(&playlist_id).await;
        info!(playlist_id = %playlist_id, title = %title, videos = items.len(), "Playlist loaded");

        Ok(Playlist::new(title, items))
    }

    async fn playlist_title(&self, playlist_id: &str) -> String {
        let response = match self.api.playlist_details(playlist_id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(playlist_id = %playlist_id, error = %e, "Playlist title lookup failed");
                return PLACEHOLDER_PLAYLIST_TITLE.to_string();
            }
        };

        response
            .items
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|playlist| playlist.snippet)
            .and_then(|snippet| snippet.title)
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_PLAYLIST_TITLE.to_string())
    }
}

// Joins listing records with their durations and assigns 1-based positions
fn merge_items(snippets: Vec<VideoSnippet>, durations: &HashMap<String, String>) -> Vec<PlaylistItem> {
    snippets
        .into_iter()
        .enumerate()
        .map(|(index, snippet)| {
            let duration = durations
                .get(&snippet.video_id)
                .cloned()
                .unwrap_or_else(|| DEFAULT_DURATION.to_string());

            PlaylistItem {
                video_id: snippet.video_id,
                title: snippet.title,
                thumbnail_url: snippet.thumbnail_url,
                duration,
                position: index + 1,
            }
        })
        .collect()
}
