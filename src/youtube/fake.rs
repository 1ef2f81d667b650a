// In-memory PlaylistApi used by the pipeline tests.
// Records every request so tests can assert on pagination and batching.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Mutex;

use crate::error::ApiError;
use crate::youtube::api::{
    ApiErrorBody, ItemContentDetails, ItemSnippet, PlaylistApi, PlaylistItemResource,
    PlaylistItemsResponse, PlaylistListResponse, PlaylistResource, PlaylistSnippet, Thumbnail,
    Thumbnails, VideoContentDetails, VideoListResponse, VideoResource, MAX_PAGE_SIZE,
};

enum PageReply {
    Page(PlaylistItemsResponse),
    Transport(String),
}

pub enum TitleReply {
    Title(String),
    Empty,
    Fail,
}

pub fn listing_page(ids: Range<usize>, next_token: Option<&str>) -> PlaylistItemsResponse {
    let items = ids
        .map(|i| PlaylistItemResource {
            snippet: Some(ItemSnippet {
                title: format!("Video {}", i),
                thumbnails: Some(Thumbnails {
                    medium: Some(Thumbnail {
                        url: Some(format!("https://i.ytimg.com/vi/vid{}/mqdefault.jpg", i)),
                    }),
                    default: None,
                }),
            }),
            content_details: Some(ItemContentDetails {
                video_id: Some(format!("vid{}", i)),
            }),
        })
        .collect();

    PlaylistItemsResponse {
        items: Some(items),
        next_page_token: next_token.map(str::to_string),
        error: None,
    }
}

pub struct FakeApi {
    pages: Mutex<Vec<PageReply>>,
    durations: Mutex<HashMap<String, String>>,
    failing_batches: Mutex<HashSet<usize>>,
    rejected_batches: Mutex<HashSet<usize>>,
    title: Mutex<TitleReply>,
    listing_calls: Mutex<Vec<Option<String>>>,
    detail_calls: Mutex<Vec<Vec<String>>>,
    title_calls: Mutex<usize>,
}

impl Default for FakeApi {
    fn default() -> Self {
        FakeApi {
            pages: Mutex::new(Vec::new()),
            durations: Mutex::new(HashMap::new()),
            failing_batches: Mutex::new(HashSet::new()),
            rejected_batches: Mutex::new(HashSet::new()),
            title: Mutex::new(TitleReply::Title("Fake Playlist".to_string())),
            listing_calls: Mutex::new(Vec::new()),
            detail_calls: Mutex::new(Vec::new()),
            title_calls: Mutex::new(0),
        }
    }
}

impl FakeApi {
    // `total` videos named vid0..vidN split into full pages with
    // tokens page-1, page-2, ...; every video gets a duration of PT<i>S
    pub fn with_listing(total: usize) -> Self {
        let api = FakeApi::default();
        let page_count = total.div_ceil(MAX_PAGE_SIZE).max(1);

        for page in 0..page_count {
            let start = page * MAX_PAGE_SIZE;
            let end = (start + MAX_PAGE_SIZE).min(total);
            let token = (page + 1 < page_count).then(|| format!("page-{}", page + 1));
            api.push_page(listing_page(start..end, token.as_deref()));
        }
        for i in 0..total {
            api.set_duration(&format!("vid{}", i), &format!("PT{}S", i));
        }
        api
    }

    pub fn push_page(&self, page: PlaylistItemsResponse) {
        self.pages.lock().unwrap().push(PageReply::Page(page));
    }

    pub fn push_listing_error(&self, message: &str) {
        self.push_page(PlaylistItemsResponse {
            items: None,
            next_page_token: None,
            error: Some(ApiErrorBody {
                code: Some(404),
                message: message.to_string(),
            }),
        });
    }

    pub fn push_transport_failure(&self, message: &str) {
        self.pages
            .lock()
            .unwrap()
            .push(PageReply::Transport(message.to_string()));
    }

    pub fn set_duration(&self, video_id: &str, token: &str) {
        self.durations
            .lock()
            .unwrap()
            .insert(video_id.to_string(), token.to_string());
    }

    pub fn clear_durations(&self) {
        self.durations.lock().unwrap().clear();
    }

    // Batch index (0-based, in request order) that answers with a transport error
    pub fn fail_batch(&self, index: usize) {
        self.failing_batches.lock().unwrap().insert(index);
    }

    // Batch index that answers 403 with an error object instead of items
    pub fn reject_batch(&self, index: usize) {
        self.rejected_batches.lock().unwrap().insert(index);
    }

    pub fn set_title(&self, reply: TitleReply) {
        *self.title.lock().unwrap() = reply;
    }

    pub fn listing_calls(&self) -> Vec<Option<String>> {
        self.listing_calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<Vec<String>> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.listing_calls.lock().unwrap().len()
            + self.detail_calls.lock().unwrap().len()
            + *self.title_calls.lock().unwrap()
    }

    // First page answers a request without a token; any other token selects
    // the page after the one that handed it out
    fn page_index(pages: &[PageReply], token: Option<&str>) -> Option<usize> {
        let Some(token) = token else {
            return Some(0);
        };
        pages
            .iter()
            .position(|reply| match reply {
                PageReply::Page(page) => page.next_page_token.as_deref() == Some(token),
                PageReply::Transport(_) => false,
            })
            .map(|i| i + 1)
    }
}

#[async_trait]
impl PlaylistApi for FakeApi {
    async fn playlist_items(
        &self,
        _playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsResponse, ApiError> {
        self.listing_calls
            .lock()
            .unwrap()
            .push(page_token.map(str::to_string));

        let pages = self.pages.lock().unwrap();
        match Self::page_index(&pages, page_token).and_then(|i| pages.get(i)) {
            Some(PageReply::Page(page)) => Ok(page.clone()),
            Some(PageReply::Transport(message)) => Err(ApiError::Network(message.clone())),
            None => Ok(PlaylistItemsResponse::default()),
        }
    }

    async fn video_details(&self, video_ids: &[String]) -> Result<VideoListResponse, ApiError> {
        let batch_index = {
            let mut calls = self.detail_calls.lock().unwrap();
            calls.push(video_ids.to_vec());
            calls.len() - 1
        };

        if self.failing_batches.lock().unwrap().contains(&batch_index) {
            return Err(ApiError::Network("connection reset".to_string()));
        }
        if self.rejected_batches.lock().unwrap().contains(&batch_index) {
            return Ok(VideoListResponse {
                items: None,
                error: Some(ApiErrorBody {
                    code: Some(403),
                    message: "quotaExceeded".to_string(),
                }),
            });
        }

        let durations = self.durations.lock().unwrap();
        let items = video_ids
            .iter()
            .filter_map(|id| {
                durations.get(id).map(|token| VideoResource {
                    id: id.clone(),
                    content_details: Some(VideoContentDetails {
                        duration: Some(token.clone()),
                    }),
                })
            })
            .collect();

        Ok(VideoListResponse {
            items: Some(items),
            error: None,
        })
    }

    async fn playlist_details(&self, _playlist_id: &str) -> Result<PlaylistListResponse, ApiError> {
        *self.title_calls.lock().unwrap() += 1;

        match &*self.title.lock().unwrap() {
            TitleReply::Title(title) => Ok(PlaylistListResponse {
                items: Some(vec![PlaylistResource {
                    snippet: Some(PlaylistSnippet {
                        title: Some(title.clone()),
                    }),
                }]),
                error: None,
            }),
            TitleReply::Empty => Ok(PlaylistListResponse {
                items: Some(Vec::new()),
                error: None,
            }),
            TitleReply::Fail => Err(ApiError::Status(500, "backend error".to_string())),
        }
    }
}
