// ==========================================
// AUDIO PLAYER HANDLE
// ==========================================
// The concrete external player: yt-dlp fetches a video's audio, rodio plays it.
//
// Each handle owns one background thread. That thread holds the rodio
// OutputStream and Sink for as long as the handle lives, and the handle only
// talks to it through a command channel:
//
//   controller ──Play / SetRate / Destroy──▶ player thread
//   controller ◀──Ready / StateChanged───── player thread (tagged events)
//
// Thread lifecycle:
// 1. fetch audio (slow: yt-dlp download + conversion, or a cache hit)
// 2. Destroy during the fetch kills yt-dlp → exit without a single signal
// 3. open output, decode, cue the track paused → emit Ready
// 4. loop: apply commands, emit Playing when started, Ended when drained
// 5. Destroy (or the handle being dropped) → stop output, exit

use rodio::{Decoder, OutputStream, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::HandleError;
use crate::player::handle::{
    HandleEvents, HandleFactory, PlayerEvent, PlayerHandle, PlayerState, PlayerVars,
};
use crate::youtube::extractor::{Fetched, YouTubeExtractor};

// How often the player thread checks whether the track has drained
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Play,
    SetRate(f32),
    Destroy,
}

// ==========================================
// RodioHandle
// ==========================================
pub struct RodioHandle {
    video_id: String,
    commands: Sender<Command>,
    destroyed: bool,
}

impl RodioHandle {
    fn send(&self, command: Command) {
        // The thread may already have exited (fetch failed); nothing to do then
        if self.commands.send(command).is_err() {
            debug!(video_id = %self.video_id, ?command, "Player thread gone, command dropped");
        }
    }
}

impl PlayerHandle for RodioHandle {
    fn play(&mut self) {
        self.send(Command::Play);
    }

    fn set_rate(&mut self, rate: f32) {
        self.send(Command::SetRate(rate));
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.send(Command::Destroy);
        }
    }
}

// ==========================================
// RodioHandleFactory
// ==========================================
pub struct RodioHandleFactory {
    extractor: YouTubeExtractor,
}

impl RodioHandleFactory {
    pub fn new(extractor: YouTubeExtractor) -> Self {
        RodioHandleFactory { extractor }
    }
}

impl HandleFactory for RodioHandleFactory {
    type Handle = RodioHandle;

    fn create(
        &mut self,
        video_id: &str,
        vars: &PlayerVars,
        events: HandleEvents,
    ) -> Result<RodioHandle, HandleError> {
        // Related videos and branding only exist for video players
        debug!(
            video_id = %video_id,
            tag = events.tag(),
            suppress_related = vars.suppress_related,
            minimal_branding = vars.minimal_branding,
            cache = %self.extractor.cache_dir().display(),
            "Creating audio player"
        );

        let (tx, rx) = mpsc::channel();
        let extractor = self.extractor.clone();
        let thread_video_id = video_id.to_string();

        std::thread::Builder::new()
            .name(format!("player-{}", video_id))
            .spawn(move || run_player(&thread_video_id, &extractor, rx, events))
            .map_err(|e| HandleError::Spawn(e.to_string()))?;

        Ok(RodioHandle {
            video_id: video_id.to_string(),
            commands: tx,
            destroyed: false,
        })
    }
}

// Settings that arrived before the track was cued
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    rate: f32,
    play: bool,
}

// Drains queued commands. Returns None if the handle was destroyed.
fn drain_pending(commands: &Receiver<Command>, mut pending: Pending) -> Option<Pending> {
    loop {
        match commands.try_recv() {
            Ok(Command::Play) => pending.play = true,
            Ok(Command::SetRate(rate)) => pending.rate = rate,
            Ok(Command::Destroy) | Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => return Some(pending),
        }
    }
}

fn open_track(path: &Path) -> Result<Decoder<BufReader<File>>, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open audio file: {}", e))?;
    Decoder::new(BufReader::new(file)).map_err(|e| format!("Audio decode failed: {}", e))
}

fn run_player(
    video_id: &str,
    extractor: &YouTubeExtractor,
    commands: Receiver<Command>,
    events: HandleEvents,
) {
    // Commands are folded while the download runs; Destroy abandons it
    let mut pending = Pending {
        rate: 1.0,
        play: false,
    };
    let fetched = extractor.fetch_audio(video_id, || match drain_pending(&commands, pending) {
        Some(next) => {
            pending = next;
            false
        }
        None => true,
    });

    let path = match fetched {
        Ok(Fetched::Ready(path)) => path,
        Ok(Fetched::Cancelled) => {
            debug!(video_id = %video_id, "Player destroyed while fetching");
            return;
        }
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Audio fetch failed");
            return;
        }
    };

    let Some(pending) = drain_pending(&commands, pending) else {
        debug!(video_id = %video_id, "Player destroyed while fetching");
        return;
    };

    // The stream must outlive the sink; both stay on this thread
    let (_stream, output) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "No audio output device");
            return;
        }
    };
    let sink = match Sink::try_new(&output) {
        Ok(sink) => sink,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Could not open audio sink");
            return;
        }
    };
    let decoder = match open_track(&path) {
        Ok(decoder) => decoder,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, path = %path.display(), "Unplayable audio");
            return;
        }
    };

    sink.pause();
    sink.set_speed(pending.rate);
    sink.append(decoder);

    if !events.emit(PlayerEvent::Ready) {
        return;
    }

    let mut state = PlayerState::Other;
    let start = |sink: &Sink, state: &mut PlayerState| {
        sink.play();
        if *state != PlayerState::Playing {
            *state = PlayerState::Playing;
            events.emit(PlayerEvent::StateChanged(PlayerState::Playing));
        }
    };

    if pending.play {
        start(&sink, &mut state);
    }

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Play) => start(&sink, &mut state),
            Ok(Command::SetRate(rate)) => sink.set_speed(rate),
            Ok(Command::Destroy) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if state == PlayerState::Playing && sink.empty() {
            state = PlayerState::Ended;
            events.emit(PlayerEvent::StateChanged(PlayerState::Ended));
        }
    }

    sink.stop();
    debug!(video_id = %video_id, "Audio player stopped");
}
