// Main TUI application using ratatui
// Handles the terminal interface, user input, and display. Playlist loads run
// in background tasks; player signals arrive over a channel. Both are drained
// once per frame and handed to the playback controller.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::player::audio::RodioHandleFactory;
use crate::player::controller::PlaybackController;
use crate::player::handle::TaggedEvent;
use crate::youtube::api::YouTubeDataClient;
use crate::youtube::extractor::YouTubeExtractor;
use crate::youtube::ingest::{IngestOutcome, Ingestor};

const TICK: Duration = Duration::from_millis(100);

enum AppMode {
    Normal,
    EditingLink,
}

pub struct PlaylistPlayerApp {
    controller: PlaybackController<RodioHandleFactory>,
    player_rx: mpsc::UnboundedReceiver<TaggedEvent>,
    ingestor: Arc<Ingestor<YouTubeDataClient>>,
    ingest_tx: mpsc::UnboundedSender<IngestOutcome>,
    ingest_rx: mpsc::UnboundedReceiver<IngestOutcome>,
    pending_link: Option<String>,
    link_input: String,
    selected_item: usize,
    shown_active: Option<String>,
    mode: AppMode,
    loading: bool,
    error: Option<String>,
    status_message: String,
    should_quit: bool,
}

impl PlaylistPlayerApp {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let (player_tx, player_rx) = mpsc::unbounded_channel();
        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();

        let extractor =
            YouTubeExtractor::new(config.cache_dir.clone()).with_program(config.yt_dlp.clone());
        let factory = RodioHandleFactory::new(extractor);
        let client = YouTubeDataClient::new(config)?;

        Ok(PlaylistPlayerApp {
            controller: PlaybackController::new(factory, player_tx, config.autoplay),
            player_rx,
            ingestor: Arc::new(Ingestor::new(client)),
            ingest_tx,
            ingest_rx,
            pending_link: config.initial_link.clone(),
            link_input: config.initial_link.clone().unwrap_or_default(),
            selected_item: 0,
            shown_active: None,
            mode: AppMode::Normal,
            loading: false,
            error: None,
            status_message: String::new(),
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        // Release the player before giving the terminal back
        self.controller.shutdown();

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        if let Some(link) = self.pending_link.take() {
            self.start_load(link);
        }

        loop {
            // Finished playlist loads (stale generations are dropped by accept)
            while let Ok(outcome) = self.ingest_rx.try_recv() {
                self.apply_outcome(outcome);
            }

            // Player signals: ready, playing, ended
            while let Ok(event) = self.player_rx.try_recv() {
                self.controller.handle_event(event);
            }

            self.follow_active();
            terminal.draw(|f| self.draw_ui(f))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    // ==========================================
    // LOADING
    // ==========================================

    fn start_load(&mut self, link: String) {
        let generation = self.ingestor.spawn_load(link, self.ingest_tx.clone());
        self.loading = true;
        self.error = None;
        self.status_message = "Loading playlist...".to_string();
        debug!(generation, "Started playlist load");
    }

    fn apply_outcome(&mut self, outcome: IngestOutcome) {
        let Some(result) = self.ingestor.accept(outcome) else {
            return;
        };
        self.loading = false;

        match result {
            Ok(playlist) => {
                self.status_message = format!("Loaded {} videos", playlist.len());
                self.selected_item = 0;
                self.controller.load_playlist(playlist);
            }
            Err(e) => {
                info!(error = %e, "Playlist load failed");
                self.error = Some(e.user_message().to_string());
                self.status_message.clear();
                self.controller.reset();
            }
        }
    }

    // Moves the list cursor along when the active video changes on its own
    // (autoplay) and reports what is playing now
    fn follow_active(&mut self) {
        let active = self.controller.active().map(str::to_string);
        if active == self.shown_active {
            return;
        }

        if let Some(video_id) = active.as_deref() {
            let playlist = self.controller.playlist();
            if let Some(index) = playlist.index_of(video_id) {
                self.selected_item = index;
                self.status_message = format!("Now playing: {}", playlist.items()[index].title);
            }
        }
        self.shown_active = active;
    }

    // ==========================================
    // INPUT
    // ==========================================

    fn handle_input(&mut self, key: KeyCode) {
        match self.mode {
            AppMode::EditingLink => match key {
                KeyCode::Char(c) => self.link_input.push(c),
                KeyCode::Backspace => {
                    self.link_input.pop();
                }
                KeyCode::Enter => {
                    self.mode = AppMode::Normal;
                    let link = self.link_input.trim().to_string();
                    self.start_load(link);
                }
                KeyCode::Esc => self.mode = AppMode::Normal,
                _ => {}
            },
            AppMode::Normal => match key {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Char('l') | KeyCode::Char('/') => self.mode = AppMode::EditingLink,
                KeyCode::Char('j') | KeyCode::Down => self.next_item(),
                KeyCode::Char('k') | KeyCode::Up => self.prev_item(),
                KeyCode::Enter => self.play_selected(),
                KeyCode::Char(' ') => {
                    if self.controller.is_bound() {
                        self.controller.play();
                    } else {
                        self.play_selected();
                    }
                }
                KeyCode::Char('s') => {
                    let rate = self.controller.cycle_speed();
                    self.status_message = format!("Speed: {}x", rate);
                }
                KeyCode::Char('a') => {
                    let on = self.controller.toggle_autoplay();
                    self.status_message = format!("Autoplay {}", if on { "on" } else { "off" });
                }
                _ => {}
            },
        }
    }

    fn next_item(&mut self) {
        let len = self.controller.playlist().len();
        if len > 0 {
            self.selected_item = (self.selected_item + 1) % len;
        }
    }

    fn prev_item(&mut self) {
        let len = self.controller.playlist().len();
        if len > 0 {
            self.selected_item = (self.selected_item + len - 1) % len;
        }
    }

    fn play_selected(&mut self) {
        let video_id = self
            .controller
            .playlist()
            .items()
            .get(self.selected_item)
            .map(|item| item.video_id.clone());

        if let Some(video_id) = video_id {
            self.controller.select(&video_id);
        }
    }

    // ==========================================
    // DRAWING
    // ==========================================

    fn draw_ui(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ])
            .split(frame.size());

        self.draw_link_input(frame, chunks[0]);
        self.draw_progress(frame, chunks[1]);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[2]);
        self.draw_now_playing(frame, main_chunks[0]);
        self.draw_playlist(frame, main_chunks[1]);

        let footer = match self.mode {
            AppMode::EditingLink => "[Enter]Load [Esc]Cancel".to_string(),
            AppMode::Normal if !self.status_message.is_empty() => self.status_message.clone(),
            AppMode::Normal => {
                "[l]Link [j/k]Navigate [Enter]Play selected [Space]Play [s]Speed [a]Autoplay [q]Quit"
                    .to_string()
            }
        };
        let footer = Paragraph::new(footer).block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[3]);
    }

    fn draw_link_input(&self, frame: &mut Frame, area: Rect) {
        let (text, style) = match self.mode {
            AppMode::EditingLink => (
                format!("{}_", self.link_input),
                Style::default().fg(Color::Yellow),
            ),
            AppMode::Normal if self.link_input.is_empty() => (
                "Press 'l' and paste a playlist link...".to_string(),
                Style::default().fg(Color::DarkGray),
            ),
            AppMode::Normal => (self.link_input.clone(), Style::default()),
        };

        let title = if self.loading { "Play-View (loading...)" } else { "Play-View" };
        let input = Paragraph::new(text)
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(input, area);
    }

    fn draw_progress(&self, frame: &mut Frame, area: Rect) {
        let progress = self.controller.progress();
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Playlist Progress"))
            .gauge_style(Style::default().fg(Color::Indexed(147)))
            .ratio(progress.ratio())
            .label(format!("{} / {} Videos", progress.position, progress.total));
        frame.render_widget(gauge, area);
    }

    fn draw_now_playing(&self, frame: &mut Frame, area: Rect) {
        let playlist = self.controller.playlist();
        let active = self.controller.active().and_then(|id| playlist.get(id));

        let now_playing = match active {
            Some(item) => format!(
                "Now Playing: {}\nVideo {} of {} [{}]\nArtwork: {}",
                item.title,
                item.position,
                playlist.len(),
                item.duration,
                item.thumbnail_url
            ),
            None => "No video playing".to_string(),
        };

        let mut lines = vec![
            now_playing,
            String::new(),
            format!("Speed: {}", self.controller.speed().label()),
            format!(
                "Autoplay: {}",
                if self.controller.autoplay() { "on" } else { "off" }
            ),
        ];
        if let Some(error) = &self.error {
            lines.push(String::new());
            lines.push(error.clone());
        }

        let style = if self.error.is_some() {
            Style::default().fg(Color::LightRed)
        } else {
            Style::default()
        };
        let info = Paragraph::new(lines.join("\n"))
            .style(style)
            .block(Block::default().borders(Borders::ALL).title("Player"));
        frame.render_widget(info, area);
    }

    fn draw_playlist(&self, frame: &mut Frame, area: Rect) {
        let playlist = self.controller.playlist();
        let active = self.controller.active();

        let items: Vec<ListItem> = if self.loading {
            vec![ListItem::new("Loading...")]
        } else {
            playlist
                .items()
                .iter()
                .map(|item| {
                    let content = format!("{:>3}. {} [{}]", item.position, item.title, item.duration);
                    let style = if active == Some(item.video_id.as_str()) {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(content).style(style)
                })
                .collect()
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(playlist.display_title().to_string()),
            )
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if !self.loading && !playlist.is_empty() {
            state.select(Some(self.selected_item.min(playlist.len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}
