// Paged playlist listing
// Walks playlistItems page by page, following nextPageToken until the server
// stops handing one out

use tracing::{debug, warn};

use crate::error::IngestError;
use crate::youtube::api::{PlaylistApi, PlaylistItemResource};

pub const PLACEHOLDER_THUMBNAIL: &str = "https://placehold.co/160x90/000000/FFFFFF?text=No+Img";

// A listing record that passed validation, before it gets a position and a
// duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSnippet {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
}

impl VideoSnippet {
    // Keeps only records with a video id, a snippet and a thumbnail set.
    // Thumbnail: medium → default → placeholder.
    fn from_resource(resource: PlaylistItemResource) -> Option<Self> {
        let video_id = resource
            .content_details?
            .video_id
            .filter(|id| !id.is_empty())?;
        let snippet = resource.snippet?;
        let thumbnails = snippet.thumbnails?;

        let thumbnail_url = [thumbnails.medium, thumbnails.default]
            .into_iter()
            .flatten()
            .filter_map(|thumb| thumb.url)
            .find(|url| !url.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_THUMBNAIL.to_string());

        Some(VideoSnippet {
            video_id,
            title: snippet.title,
            thumbnail_url,
        })
    }
}

// ==========================================
// PAGE CURSOR
// ==========================================
// A one-pass sequence of listing pages.
//
// Each call to next_page() issues one request carrying the token from the
// previous response. Once the sequence ends (no token, no items, or an
// error) every further call returns Ok(None); it cannot be rewound.
pub struct PageCursor<'a, A: PlaylistApi + ?Sized> {
    api: &'a A,
    playlist_id: &'a str,
    next_token: Option<String>,
    finished: bool,
    pages_fetched: usize,
}

impl<'a, A: PlaylistApi + ?Sized> PageCursor<'a, A> {
    pub fn new(api: &'a A, playlist_id: &'a str) -> Self {
        PageCursor {
            api,
            playlist_id,
            next_token: None,
            finished: false,
            pages_fetched: 0,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<VideoSnippet>>, IngestError> {
        if self.finished {
            return Ok(None);
        }

        let request = self
            .api
            .playlist_items(self.playlist_id, self.next_token.as_deref());
        let response = match request.await {
            Ok(response) => response,
            Err(e) => {
                self.finished = true;
                return Err(e.into());
            }
        };
        self.pages_fetched += 1;

        if let Some(error) = response.error {
            self.finished = true;
            warn!(code = ?error.code, message = %error.message, "Listing page rejected by server");
            return Err(IngestError::FetchFailure(error.message));
        }

        // Malformed page: stop quietly with whatever was collected so far
        let Some(items) = response.items else {
            debug!(page = self.pages_fetched, "Listing page without items, stopping");
            self.finished = true;
            return Ok(None);
        };

        let received = items.len();
        let snippets: Vec<VideoSnippet> = items
            .into_iter()
            .filter_map(VideoSnippet::from_resource)
            .collect();
        if snippets.len() < received {
            debug!(
                page = self.pages_fetched,
                dropped = received - snippets.len(),
                "Skipped incomplete playlist records"
            );
        }

        let token = response.next_page_token.filter(|t| !t.is_empty());
        match token {
            Some(token) if self.next_token.as_deref() == Some(token.as_str()) => {
                warn!(token = %token, "Server repeated the page token, stopping pagination");
                self.finished = true;
            }
            Some(token) => self.next_token = Some(token),
            None => self.finished = true,
        }

        Ok(Some(snippets))
    }
}

// Drains a PageCursor into one list, in server order
pub async fn fetch_all_snippets<A: PlaylistApi + ?Sized>(
    api: &A,
    playlist_id: &str,
) -> Result<Vec<VideoSnippet>, IngestError> {
    let mut cursor = PageCursor::new(api, playlist_id);
    let mut snippets = Vec::new();

    while let Some(page) = cursor.next_page().await? {
        snippets.extend(page);
    }

    debug!(
        playlist_id = %playlist_id,
        pages = cursor.pages_fetched(),
        videos = snippets.len(),
        "Playlist listing complete"
    );
    Ok(snippets)
}
