// ==========================================
// PLAYLIST MODULE
// ==========================================
// The ordered collection of videos produced by one ingestion.
//
// A Playlist is built once and never edited: loading another link replaces
// the whole value. Lookups are by video id, which is unique within a playlist.
//
// Navigation is circular: the item after the last one is the first one.

// Title shown when nothing is loaded or a load failed
pub const FALLBACK_TITLE: &str = "Playlist";

// ==========================================
// PLAYLIST ITEM
// ==========================================
// One video, ready for display and playback.
//
// video_id: String
//   - YouTube video id, e.g. "dQw4w9WgXcQ"
//   - Identity of the item; the player is created against it
//
// title / thumbnail_url: String
//   - Straight from the listing snippet (thumbnail already resolved through
//     the medium → default → placeholder chain)
//
// duration: String
//   - Display form, e.g. "4:13" or "1:05:30"
//   - "0:00" when the details endpoint had nothing for this video
//
// position: usize
//   - 1-based place in the playlist, equal to list index + 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration: String,
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    title: String,
    items: Vec<PlaylistItem>,
}

impl Playlist {
    pub fn new(title: String, items: Vec<PlaylistItem>) -> Self {
        Playlist { title, items }
    }

    // Nothing loaded
    pub fn empty() -> Self {
        Playlist::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    // Title for display, falling back when nothing is loaded
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            FALLBACK_TITLE
        } else {
            &self.title
        }
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&PlaylistItem> {
        self.items.first()
    }

    pub fn index_of(&self, video_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.video_id == video_id)
    }

    pub fn get(&self, video_id: &str) -> Option<&PlaylistItem> {
        self.items.iter().find(|item| item.video_id == video_id)
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.index_of(video_id).is_some()
    }

    // ==========================================
    // NAVIGATION: next_after()
    // ==========================================
    // The item that follows `video_id`, wrapping to the first after the last.
    //
    // Returns None when the playlist is empty or the id is not part of it.
    //
    // Example:
    // - Playlist: [A, B, C]
    // - next_after("B") → C
    // - next_after("C") → A
    // - Playlist: [A] → next_after("A") → A
    pub fn next_after(&self, video_id: &str) -> Option<&PlaylistItem> {
        let index = self.index_of(video_id)?;
        self.items.get((index + 1) % self.items.len())
    }
}
