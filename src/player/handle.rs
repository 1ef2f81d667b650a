// External player abstraction
//
// The playback controller never touches a concrete player. It asks a
// HandleFactory for a PlayerHandle bound to one video, drives it through
// play / set_rate / destroy, and listens for the signals it sends back.

use tokio::sync::mpsc;

use crate::error::HandleError;

// Identifies one created handle; a new tag is issued for every creation
pub type HandleTag = u64;

// State reported by a live player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Ended,
    Other,
}

// Signals a handle sends back to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    // Loaded and able to accept play / set_rate
    Ready,
    StateChanged(PlayerState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedEvent {
    pub tag: HandleTag,
    pub event: PlayerEvent,
}

// Creation options passed to every player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerVars {
    // Don't show related videos at the end
    pub suppress_related: bool,
    // Minimal branding
    pub minimal_branding: bool,
}

impl Default for PlayerVars {
    fn default() -> Self {
        PlayerVars {
            suppress_related: true,
            minimal_branding: true,
        }
    }
}

// ==========================================
// EVENT EMITTER
// ==========================================
// Given to a handle at creation. Every event it sends is stamped with the
// handle's tag, so the controller can tell a live handle's signals from
// leftovers of one it already released.
#[derive(Debug, Clone)]
pub struct HandleEvents {
    tag: HandleTag,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl HandleEvents {
    pub fn new(tag: HandleTag, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        HandleEvents { tag, tx }
    }

    pub fn tag(&self) -> HandleTag {
        self.tag
    }

    // Returns false once the receiving side is gone
    pub fn emit(&self, event: PlayerEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                tag: self.tag,
                event,
            })
            .is_ok()
    }
}

// ==========================================
// PLAYER CONTRACT
// ==========================================
pub trait PlayerHandle {
    fn play(&mut self);
    fn set_rate(&mut self, rate: f32);
    // Releases the underlying player; called exactly once, by ScopedHandle
    fn destroy(&mut self);
}

pub trait HandleFactory {
    type Handle: PlayerHandle;

    fn create(
        &mut self,
        video_id: &str,
        vars: &PlayerVars,
        events: HandleEvents,
    ) -> Result<Self::Handle, HandleError>;
}

// ==========================================
// SCOPED HANDLE
// ==========================================
// Owns a live handle and destroys it when dropped.
//
// Replacing or clearing the Option<ScopedHandle> that holds it is the only
// way a handle goes away, so every exit path (new video, reset, shutdown,
// controller dropped) releases it exactly once.
pub struct ScopedHandle<H: PlayerHandle> {
    video_id: String,
    tag: HandleTag,
    handle: H,
}

impl<H: PlayerHandle> ScopedHandle<H> {
    pub fn new(video_id: String, tag: HandleTag, handle: H) -> Self {
        ScopedHandle {
            video_id,
            tag,
            handle,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn tag(&self) -> HandleTag {
        self.tag
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }
}

impl<H: PlayerHandle> Drop for ScopedHandle<H> {
    fn drop(&mut self) {
        self.handle.destroy();
    }
}
