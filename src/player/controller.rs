// ==========================================
// PLAYBACK CONTROLLER
// ==========================================
// Owns the one external player and decides when it is built and torn down.
//
// States:
// - Idle:  no active video, no handle
// - Bound: active video set, one live handle created for it
//
// What causes a rebuild (old handle destroyed, new one created):
// - a different video becomes active (user pick or autoplay advance)
// - a new playlist is loaded
//
// What never causes a rebuild:
// - speed changes: pushed straight into the live handle
// - autoplay toggles: read the next time a handle becomes ready or ends
//
// Speed and autoplay live here, outside the active video, so they survive
// every rebuild and are re-applied when the new handle reports Ready.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::player::handle::{
    HandleEvents, HandleFactory, HandleTag, PlayerEvent, PlayerHandle, PlayerState, PlayerVars,
    ScopedHandle, TaggedEvent,
};
use crate::player::playlist::Playlist;
use crate::player::progress::Progress;
use crate::player::speed::SpeedCycler;

pub struct PlaybackController<F: HandleFactory> {
    factory: F,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    vars: PlayerVars,
    playlist: Playlist,
    active: Option<String>,
    live: Option<ScopedHandle<F::Handle>>,
    last_tag: HandleTag,
    speed: SpeedCycler,
    autoplay: bool,
}

impl<F: HandleFactory> PlaybackController<F> {
    // Events from every handle this controller creates are sent on `events_tx`;
    // the owner feeds them back through handle_event()
    pub fn new(factory: F, events_tx: mpsc::UnboundedSender<TaggedEvent>, autoplay: bool) -> Self {
        PlaybackController {
            factory,
            events_tx,
            vars: PlayerVars::default(),
            playlist: Playlist::empty(),
            active: None,
            live: None,
            last_tag: 0,
            speed: SpeedCycler::new(),
            autoplay,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.live.is_some()
    }

    pub fn speed(&self) -> &SpeedCycler {
        &self.speed
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn progress(&self) -> Progress {
        Progress::derive(&self.playlist, self.active())
    }

    // ==========================================
    // PLAYLIST CHANGES
    // ==========================================

    // Replaces the playlist wholesale and binds to its first video.
    // Always rebuilds, even when the first video is the one already playing.
    pub fn load_playlist(&mut self, playlist: Playlist) {
        let first = playlist.first().map(|item| item.video_id.clone());
        info!(title = %playlist.title(), videos = playlist.len(), "Playlist replaced");

        self.release();
        self.playlist = playlist;
        self.active = first;
        self.bind();
    }

    // Clears playlist and selection (failed or invalid load) → Idle
    pub fn reset(&mut self) {
        self.release();
        self.playlist = Playlist::empty();
        self.active = None;
    }

    // User picked a video from the list.
    // Returns false (and changes nothing) if the id is not in the playlist.
    pub fn select(&mut self, video_id: &str) -> bool {
        if !self.playlist.contains(video_id) {
            warn!(video_id = %video_id, "Ignoring selection outside the loaded playlist");
            return false;
        }

        if self.active.as_deref() == Some(video_id) && self.live.is_some() {
            debug!(video_id = %video_id, "Video already active");
            return true;
        }

        self.release();
        self.active = Some(video_id.to_string());
        self.bind();
        true
    }

    // ==========================================
    // SETTINGS
    // ==========================================

    // Next speed in the ring; applied to the live handle immediately
    pub fn cycle_speed(&mut self) -> f32 {
        let rate = self.speed.advance();
        if let Some(live) = self.live.as_mut() {
            live.handle_mut().set_rate(rate);
        }
        debug!(rate, "Playback speed changed");
        rate
    }

    pub fn toggle_autoplay(&mut self) -> bool {
        self.autoplay = !self.autoplay;
        debug!(autoplay = self.autoplay, "Autoplay toggled");
        self.autoplay
    }

    // Starts the live handle by hand (used when autoplay is off)
    pub fn play(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.handle_mut().play();
        }
    }

    // ==========================================
    // PLAYER SIGNALS
    // ==========================================
    // Signals from a handle that has since been released carry an old tag
    // and are dropped, so a late "ended" can never advance twice.
    pub fn handle_event(&mut self, tagged: TaggedEvent) {
        let rate = self.speed.current();
        let autoplay = self.autoplay;

        let Some(live) = self.live.as_mut() else {
            debug!(tag = tagged.tag, "Player event while idle, ignoring");
            return;
        };
        if live.tag() != tagged.tag {
            debug!(tag = tagged.tag, live = live.tag(), "Event from a released player, ignoring");
            return;
        }

        match tagged.event {
            PlayerEvent::Ready => {
                live.handle_mut().set_rate(rate);
                if autoplay {
                    live.handle_mut().play();
                }
            }
            // Players may fall back to 1x while buffering
            PlayerEvent::StateChanged(PlayerState::Playing) => {
                live.handle_mut().set_rate(rate);
            }
            PlayerEvent::StateChanged(PlayerState::Ended) => {
                if autoplay {
                    self.advance();
                }
            }
            PlayerEvent::StateChanged(PlayerState::Other) => {}
        }
    }

    // Moves to the next video, wrapping to the first after the last.
    // Always rebuilds, so a one-video playlist starts over.
    fn advance(&mut self) {
        let next = self
            .active
            .as_deref()
            .and_then(|current| self.playlist.next_after(current))
            .map(|item| item.video_id.clone());

        let Some(next) = next else {
            warn!("Active video is not in the playlist, cannot advance");
            return;
        };

        info!(video_id = %next, "Autoplay advancing");
        self.release();
        self.active = Some(next);
        self.bind();
    }

    // Releases the handle and goes Idle; also runs on drop
    pub fn shutdown(&mut self) {
        self.release();
        self.active = None;
    }

    // ==========================================
    // HANDLE LIFECYCLE
    // ==========================================

    fn release(&mut self) {
        if let Some(live) = self.live.take() {
            debug!(video_id = %live.video_id(), tag = live.tag(), "Releasing player");
            // ScopedHandle::drop destroys it here
        }
    }

    // Creates a handle for the active video. The previous one must already
    // be released.
    fn bind(&mut self) {
        debug_assert!(self.live.is_none(), "bind() with a live handle");

        let Some(video_id) = self.active.clone() else {
            return;
        };

        self.last_tag += 1;
        let tag = self.last_tag;
        let events = HandleEvents::new(tag, self.events_tx.clone());

        match self.factory.create(&video_id, &self.vars, events) {
            Ok(handle) => {
                info!(video_id = %video_id, tag, "Player created");
                self.live = Some(ScopedHandle::new(video_id, tag, handle));
            }
            Err(e) => {
                // Past the ingestion boundary: log it, keep the selection
                warn!(video_id = %video_id, error = %e, "Could not create player");
            }
        }
    }
}

impl<F: HandleFactory> Drop for PlaybackController<F> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandleError;
    use crate::player::playlist::tests::playlist_of;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(String, HandleTag),
        Play(String),
        SetRate(String, f32),
        Destroy(String),
    }

    type Log = Arc<Mutex<Vec<Call>>>;

    struct FakeHandle {
        video_id: String,
        log: Log,
    }

    impl PlayerHandle for FakeHandle {
        fn play(&mut self) {
            self.log.lock().unwrap().push(Call::Play(self.video_id.clone()));
        }

        fn set_rate(&mut self, rate: f32) {
            self.log
                .lock()
                .unwrap()
                .push(Call::SetRate(self.video_id.clone(), rate));
        }

        fn destroy(&mut self) {
            self.log.lock().unwrap().push(Call::Destroy(self.video_id.clone()));
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        log: Log,
        fail_next: bool,
    }

    impl HandleFactory for FakeFactory {
        type Handle = FakeHandle;

        fn create(
            &mut self,
            video_id: &str,
            vars: &PlayerVars,
            events: HandleEvents,
        ) -> Result<FakeHandle, HandleError> {
            assert!(vars.suppress_related && vars.minimal_branding);
            if std::mem::take(&mut self.fail_next) {
                return Err(HandleError::Spawn("no audio device".to_string()));
            }
            self.log
                .lock()
                .unwrap()
                .push(Call::Create(video_id.to_string(), events.tag()));
            Ok(FakeHandle {
                video_id: video_id.to_string(),
                log: Arc::clone(&self.log),
            })
        }
    }

    struct Harness {
        controller: PlaybackController<FakeFactory>,
        log: Log,
    }

    impl Harness {
        fn new(autoplay: bool) -> Self {
            let (tx, _rx) = mpsc::unbounded_channel();
            let factory = FakeFactory::default();
            let log = Arc::clone(&factory.log);
            Harness {
                controller: PlaybackController::new(factory, tx, autoplay),
                log,
            }
        }

        fn loaded(ids: &[&str], autoplay: bool) -> Self {
            let mut harness = Harness::new(autoplay);
            harness.controller.load_playlist(playlist_of(ids));
            harness
        }

        fn calls(&self) -> Vec<Call> {
            self.log.lock().unwrap().clone()
        }

        fn clear(&self) {
            self.log.lock().unwrap().clear();
        }

        // Sends an event as the currently live handle
        fn emit(&mut self, event: PlayerEvent) {
            let tag = self.controller.last_tag;
            self.controller.handle_event(TaggedEvent { tag, event });
        }

        fn creates(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Create(..)))
                .count()
        }
    }

    #[test]
    fn loading_binds_to_first_video() {
        let harness = Harness::loaded(&["a", "b", "c"], true);

        assert_eq!(harness.controller.active(), Some("a"));
        assert!(harness.controller.is_bound());
        assert_eq!(harness.calls(), vec![Call::Create("a".to_string(), 1)]);
    }

    #[test]
    fn ready_applies_speed_and_starts_when_autoplay() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        harness.emit(PlayerEvent::Ready);

        assert_eq!(
            harness.calls(),
            vec![
                Call::SetRate("a".to_string(), 1.0),
                Call::Play("a".to_string())
            ]
        );
    }

    #[test]
    fn ready_without_autoplay_only_sets_speed() {
        let mut harness = Harness::loaded(&["a", "b"], false);
        harness.clear();

        harness.emit(PlayerEvent::Ready);
        assert_eq!(harness.calls(), vec![Call::SetRate("a".to_string(), 1.0)]);

        harness.controller.play();
        assert_eq!(harness.calls().last(), Some(&Call::Play("a".to_string())));
    }

    #[test]
    fn changing_video_destroys_before_creating() {
        let mut harness = Harness::loaded(&["a", "b", "c"], true);
        harness.clear();

        assert!(harness.controller.select("c"));

        assert_eq!(
            harness.calls(),
            vec![
                Call::Destroy("a".to_string()),
                Call::Create("c".to_string(), 2)
            ]
        );
        assert_eq!(harness.controller.active(), Some("c"));
    }

    #[test]
    fn reselecting_active_video_is_a_no_op() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        assert!(harness.controller.select("a"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn selection_outside_playlist_is_rejected() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        assert!(!harness.controller.select("stale"));
        assert_eq!(harness.controller.active(), Some("a"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn speed_change_goes_to_live_handle_without_rebuild() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        assert_eq!(harness.controller.cycle_speed(), 1.25);

        assert_eq!(harness.calls(), vec![Call::SetRate("a".to_string(), 1.25)]);
        assert_eq!(harness.creates(), 0);
    }

    #[test]
    fn speed_change_while_idle_is_kept_for_later() {
        let mut harness = Harness::new(true);
        harness.controller.cycle_speed();
        assert!(harness.calls().is_empty());

        harness.controller.load_playlist(playlist_of(&["a"]));
        harness.emit(PlayerEvent::Ready);
        assert!(harness.calls().contains(&Call::SetRate("a".to_string(), 1.25)));
    }

    #[test]
    fn speed_survives_rebuild() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.controller.cycle_speed();
        harness.controller.cycle_speed();
        harness.controller.select("b");
        harness.clear();

        harness.emit(PlayerEvent::Ready);

        assert_eq!(
            harness.calls(),
            vec![
                Call::SetRate("b".to_string(), 1.5),
                Call::Play("b".to_string())
            ]
        );
    }

    #[test]
    fn playing_reapplies_speed() {
        let mut harness = Harness::loaded(&["a"], true);
        harness.controller.cycle_speed();
        harness.clear();

        harness.emit(PlayerEvent::StateChanged(PlayerState::Playing));
        assert_eq!(harness.calls(), vec![Call::SetRate("a".to_string(), 1.25)]);
    }

    #[test]
    fn ended_advances_and_wraps_to_first() {
        let mut harness = Harness::loaded(&["a", "b", "c"], true);
        harness.controller.select("c");
        harness.clear();

        harness.emit(PlayerEvent::StateChanged(PlayerState::Ended));

        assert_eq!(harness.controller.active(), Some("a"));
        assert_eq!(
            harness.calls(),
            vec![
                Call::Destroy("c".to_string()),
                Call::Create("a".to_string(), 3)
            ]
        );
    }

    #[test]
    fn ended_without_autoplay_stays_put() {
        let mut harness = Harness::loaded(&["a", "b"], false);
        harness.clear();

        harness.emit(PlayerEvent::StateChanged(PlayerState::Ended));

        assert_eq!(harness.controller.active(), Some("a"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn single_video_replays_on_end() {
        let mut harness = Harness::loaded(&["only"], true);
        harness.clear();

        harness.emit(PlayerEvent::StateChanged(PlayerState::Ended));

        assert_eq!(
            harness.calls(),
            vec![
                Call::Destroy("only".to_string()),
                Call::Create("only".to_string(), 2)
            ]
        );
    }

    #[test]
    fn events_from_released_handles_are_ignored() {
        let mut harness = Harness::loaded(&["a", "b", "c"], true);
        harness.controller.select("b");
        harness.clear();

        // Tag 1 belonged to the handle for "a"
        harness.controller.handle_event(TaggedEvent {
            tag: 1,
            event: PlayerEvent::StateChanged(PlayerState::Ended),
        });

        assert_eq!(harness.controller.active(), Some("b"));
        assert!(harness.calls().is_empty());
    }

    #[test]
    fn duplicate_end_signal_advances_once() {
        let mut harness = Harness::loaded(&["a", "b", "c"], true);
        let first_tag = harness.controller.last_tag;

        let ended = TaggedEvent {
            tag: first_tag,
            event: PlayerEvent::StateChanged(PlayerState::Ended),
        };
        harness.controller.handle_event(ended);
        harness.controller.handle_event(ended);

        assert_eq!(harness.controller.active(), Some("b"));
        assert_eq!(harness.creates(), 2);
    }

    #[test]
    fn autoplay_toggle_does_not_rebuild() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        assert!(!harness.controller.toggle_autoplay());
        assert!(harness.calls().is_empty());
        assert!(harness.controller.is_bound());
    }

    #[test]
    fn reset_releases_and_clears() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.controller.cycle_speed();
        harness.clear();

        harness.controller.reset();

        assert_eq!(harness.calls(), vec![Call::Destroy("a".to_string())]);
        assert!(harness.controller.active().is_none());
        assert!(harness.controller.playlist().is_empty());
        assert!(!harness.controller.is_bound());
        assert_eq!(harness.controller.speed().current(), 1.25);
    }

    #[test]
    fn reloading_rebuilds_even_for_same_first_video() {
        let mut harness = Harness::loaded(&["a", "b"], true);
        harness.clear();

        harness.controller.load_playlist(playlist_of(&["a", "b"]));

        assert_eq!(
            harness.calls(),
            vec![
                Call::Destroy("a".to_string()),
                Call::Create("a".to_string(), 2)
            ]
        );
    }

    #[test]
    fn every_handle_is_destroyed_exactly_once() {
        let log = {
            let mut harness = Harness::loaded(&["a", "b", "c"], true);
            harness.controller.select("b");
            harness.emit(PlayerEvent::StateChanged(PlayerState::Ended));
            harness.controller.select("a");
            harness.log.clone()
        };

        let calls = log.lock().unwrap().clone();
        let creates = calls.iter().filter(|c| matches!(c, Call::Create(..))).count();
        let destroys = calls.iter().filter(|c| matches!(c, Call::Destroy(..))).count();
        assert_eq!(creates, 4);
        assert_eq!(destroys, 4);
    }

    #[test]
    fn shutdown_goes_idle() {
        let mut harness = Harness::loaded(&["a"], true);
        harness.clear();

        harness.controller.shutdown();
        harness.controller.shutdown();

        assert_eq!(harness.calls(), vec![Call::Destroy("a".to_string())]);
        assert!(harness.controller.progress().position == 0);
    }

    #[test]
    fn failed_creation_keeps_selection_and_retries_on_reselect() {
        let mut harness = Harness::new(true);
        harness.controller.factory.fail_next = true;

        harness.controller.load_playlist(playlist_of(&["a", "b"]));
        assert_eq!(harness.controller.active(), Some("a"));
        assert!(!harness.controller.is_bound());

        assert!(harness.controller.select("a"));
        assert!(harness.controller.is_bound());
    }

    #[test]
    fn progress_follows_active_video() {
        let mut harness = Harness::loaded(&["a", "b", "c", "d"], true);
        harness.controller.select("b");

        let progress = harness.controller.progress();
        assert_eq!((progress.position, progress.total), (2, 4));
        assert!((progress.percentage - 50.0).abs() < 1e-9);
    }
}
