//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - `StreamingSession` + `ChatController` for the conversation
//! - `DisplayState` for rendering
//!
//! One `tokio::select!` loop multiplexes terminal events, session events, the
//! background history fetch and a frame tick. Everything that touches the
//! conversation runs on this task, so the user's prompt and the streamed
//! reply never interleave.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use gigi_core::{
    ChatController, GigiConfig, HistoryClient, Message, SessionEvent, SessionEvents,
    StreamingSession, SubmitOutcome,
};

use crate::display::DisplayState;
use crate::theme;
use crate::widgets::InputBox;

/// Target ~30 FPS
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Lines moved per mouse wheel notch
const WHEEL_STEP: usize = 3;

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Chat Integration ===
    /// Connection to the assistant
    session: StreamingSession,
    /// Events streamed by the session
    events: SessionEvents,
    /// Conversation and turn bookkeeping
    chat: ChatController,
    /// Pending history fetch, if still running
    history: Option<oneshot::Receiver<Vec<Message>>>,
    /// Display state derived from the controller
    display: DisplayState,

    // === Input State ===
    /// User input
    input: InputBox,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,
    /// Conversation viewport height from the last frame
    viewport_height: usize,

    // === Misc State ===
    /// Last frame time (for toasts)
    last_frame: Instant,
}

impl App {
    /// Create the app: starts the session and the history fetch
    #[must_use]
    pub fn new(config: &GigiConfig) -> Self {
        let (session, events) = StreamingSession::start(
            config.stream_endpoint.clone(),
            Arc::new(config.connector()),
            config.session_settings(),
        );

        let history = config.history_endpoint.clone().map(|url| {
            let (tx, rx) = oneshot::channel();
            let client = HistoryClient::new(config.history_timeout());
            tokio::spawn(async move {
                let messages = client.load(&url).await;
                let _ = tx.send(messages);
            });
            rx
        });

        Self {
            running: true,
            session,
            events,
            chat: ChatController::new(),
            history,
            display: DisplayState::new(),
            input: InputBox::new(),
            scroll_offset: 0,
            total_lines: 0,
            viewport_height: 0,
            last_frame: Instant::now(),
        }
    }

    /// Main event loop
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut frame_tick = tokio::time::interval(FRAME_INTERVAL);
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh();
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => self.handle_terminal_event(event).await,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => self.running = false,
                },

                Some(event) = self.events.recv() => {
                    self.handle_session_event(event);
                    // Drain whatever else already arrived
                    while let Ok(event) = self.events.try_recv() {
                        self.handle_session_event(event);
                    }
                }

                Some(messages) = recv_history(&mut self.history) => {
                    self.chat.seed_history(messages);
                    self.scroll_offset = 0;
                }

                _ = frame_tick.tick() => {}
            }

            self.refresh();
            terminal.draw(|frame| self.draw(frame))?;
        }

        self.session.close().await;
        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        self.chat.apply(event);
        self.scroll_offset = 0;
    }

    async fn handle_terminal_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Paste(text) => {
                for c in text.chars() {
                    if c == '\n' {
                        self.input.newline();
                    } else if c != '\r' {
                        self.input.insert(c);
                    }
                }
            }
            _ => {}
        }
    }

    /// Handle keyboard input
    async fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            // Quit
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }

            // Newline within the prompt
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.input.newline();
            }

            // Submit message
            KeyCode::Enter => self.submit().await,

            // Typing
            KeyCode::Char(c) => self.input.insert(c),
            KeyCode::Backspace => self.input.backspace(),

            // Conversation scrolling
            KeyCode::PageUp => self.scroll_up(self.page_size()),
            KeyCode::PageDown => self.scroll_down(self.page_size()),
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = self.max_scroll();
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = 0;
            }

            _ => {}
        }
    }

    async fn submit(&mut self) {
        let text = self.input.text().to_string();
        match self.chat.submit(&self.session, &text).await {
            SubmitOutcome::Sent => {
                self.input.clear();
                self.scroll_offset = 0;
            }
            SubmitOutcome::Rejected => {
                tracing::debug!("Prompt not sent, connection is {}", self.session.state());
            }
            SubmitOutcome::Ignored => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.scroll_down(WHEEL_STEP),
            _ => {}
        }
    }

    fn page_size(&self) -> usize {
        (self.viewport_height / 2).max(1)
    }

    fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_scroll());
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Derive display state for this frame
    fn refresh(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        self.display.sync(&mut self.chat, self.session.state());
        self.display.update(delta);
    }

    /// Render the UI
    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let input_rows = self.input.rows(area.width.saturating_sub(2));

        let [header, conversation, status, input] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows + 2),
        ])
        .areas(area);

        Self::render_header(frame, header);
        self.render_conversation(frame, conversation);
        self.render_status(frame, status);
        self.render_input(frame, input);
        self.render_notification(frame, conversation);
    }

    fn render_header(frame: &mut Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(" ◉ ", Style::default().fg(theme::GIGI_CYAN)),
            Span::styled(
                "Gigi the Robot",
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(theme::SLATE_BORDER));
        frame.render_widget(Paragraph::new(title).block(block), area);
    }

    /// Render conversation, bottom-anchored with `scroll_offset` lines hidden below
    fn render_conversation(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let inner = Rect {
            x: area.x + 1,
            width: area.width.saturating_sub(2),
            ..area
        };
        let width = usize::from(inner.width);
        let height = usize::from(inner.height);
        if width < 10 || height == 0 {
            return;
        }

        let lines = self.display.conversation_lines(width);
        self.total_lines = lines.len();
        self.viewport_height = height;

        // Clamp scroll offset
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());

        let visible_end = self.total_lines.saturating_sub(self.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);
        let visible: Vec<Line<'static>> = lines
            .into_iter()
            .skip(visible_start)
            .take(visible_end - visible_start)
            .collect();

        frame.render_widget(Paragraph::new(visible), inner);
    }

    /// Render status bar
    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let (state, state_style) = self.display.connection_label();
        let dim = Style::default().fg(theme::DIM_GRAY);

        let mut spans = vec![
            Span::raw(" "),
            Span::styled(state, state_style),
            Span::styled(" | Enter send | Shift+Enter newline | Esc quit", dim),
        ];
        if self.scroll_offset > 0 {
            spans.push(Span::styled(
                format!(" [^{} lines - PgDn to scroll]", self.scroll_offset),
                dim,
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Render input box
    fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::TOP | Borders::BOTTOM)
            .border_style(Style::default().fg(theme::SLATE_BORDER));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text_area = Rect {
            x: inner.x + 1,
            width: inner.width.saturating_sub(2),
            ..inner
        };
        frame.render_widget(&self.input, text_area);
    }

    /// Render the newest notice as a toast in the top-right corner
    fn render_notification(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(notification) = self.display.current_notification() else {
            return;
        };

        let message = notification.message();
        let width = (u16::try_from(message.len()).unwrap_or(u16::MAX) + 4).min(area.width);
        let toast = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y,
            width,
            height: 3.min(area.height),
        };

        let color = if notification.is_error() {
            theme::ERROR_RED
        } else {
            theme::WARN_AMBER
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        frame.render_widget(Clear, toast);
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true })
                .block(block),
            toast,
        );
    }
}

/// Resolve once the history fetch finishes; pending forever when there is none
async fn recv_history(slot: &mut Option<oneshot::Receiver<Vec<Message>>>) -> Option<Vec<Message>> {
    match slot {
        Some(rx) => {
            let result = rx.await.ok();
            *slot = None;
            result
        }
        None => std::future::pending().await,
    }
}
