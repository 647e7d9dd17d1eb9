//! Display State Types
//!
//! Types that represent the current display state for the TUI. They are
//! derived from the [`ChatController`] and the session's connection state
//! every frame, and are the only thing the render functions look at.
//!
//! - `DisplayMessage`: a conversation entry ready to render
//! - `DisplayNotification`: a notice shown as a timed toast
//! - `DisplayState`: everything on screen

use std::collections::VecDeque;
use std::time::Duration;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use gigi_core::{ChatController, ConnectionState, Message, Notice, Role};

use crate::markdown;
use crate::theme;

/// How long a notice stays on screen
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Text of the loading indicator
pub const LOADING_TEXT: &str = "Generating response...";

/// A rendered conversation message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    /// Who sent this message
    pub role: Role,
    /// The message content (markdown)
    pub content: String,
}

impl From<&Message> for DisplayMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

impl DisplayMessage {
    /// Label shown above the message
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.role.label()
    }

    fn label_style(&self) -> Style {
        let color = match self.role {
            Role::User => theme::USER_GREEN,
            Role::Assistant => theme::GIGI_CYAN,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    fn body_style(&self) -> Style {
        match self.role {
            Role::User => Style::default().bg(theme::BUBBLE_BG),
            Role::Assistant => Style::default(),
        }
    }
}

/// A notification to display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayNotification {
    /// The notice being shown
    pub notice: Notice,
    /// Time left on screen
    pub remaining: Duration,
}

impl DisplayNotification {
    /// Text of the notification
    #[must_use]
    pub fn message(&self) -> &'static str {
        self.notice.text()
    }

    /// Whether this is an error rather than a hint
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.notice, Notice::GenerationFailed)
    }
}

/// The full display state for the TUI
#[derive(Debug)]
pub struct DisplayState {
    /// Visible conversation messages
    pub messages: Vec<DisplayMessage>,
    /// Whether a reply is being generated
    pub loading: bool,
    /// Connection state of the session
    pub connection: ConnectionState,
    /// Notices on screen, oldest first
    pub notifications: VecDeque<DisplayNotification>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            loading: false,
            connection: ConnectionState::Connecting,
            notifications: VecDeque::new(),
        }
    }
}

impl DisplayState {
    /// Create a new display state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the controller and the current connection state
    ///
    /// Pending notices are drained from the controller and become toasts.
    pub fn sync(&mut self, chat: &mut ChatController, connection: ConnectionState) {
        self.messages = chat
            .conversation()
            .visible()
            .map(DisplayMessage::from)
            .collect();
        self.loading = chat.is_loading();
        self.connection = connection;

        for notice in chat.take_notices() {
            self.notify(notice);
        }
    }

    /// Show a notice for [`NOTICE_TTL`]
    pub fn notify(&mut self, notice: Notice) {
        self.notifications.push_back(DisplayNotification {
            notice,
            remaining: NOTICE_TTL,
        });
    }

    /// Update timers, dropping expired notifications
    pub fn update(&mut self, delta: Duration) {
        for notification in &mut self.notifications {
            notification.remaining = notification.remaining.saturating_sub(delta);
        }
        self.notifications.retain(|n| !n.remaining.is_zero());
    }

    /// Most recent notification, if any
    #[must_use]
    pub fn current_notification(&self) -> Option<&DisplayNotification> {
        self.notifications.back()
    }

    /// Conversation laid out for a viewport `width` columns wide
    #[must_use]
    pub fn conversation_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        for message in &self.messages {
            lines.push(Line::from(Span::styled(
                message.label(),
                message.label_style(),
            )));
            lines.extend(markdown::render(
                &message.content,
                width,
                message.body_style(),
            ));
            lines.push(Line::default());
        }

        if self.loading {
            lines.push(Line::from(Span::styled(LOADING_TEXT, theme::loading())));
        }

        lines
    }

    /// One-line connection summary for the status bar
    #[must_use]
    pub fn connection_label(&self) -> (&'static str, Style) {
        let color = match self.connection {
            ConnectionState::Open => theme::SUCCESS_GREEN,
            ConnectionState::Connecting | ConnectionState::Closed => theme::WARN_AMBER,
            ConnectionState::Stopped => theme::ERROR_RED,
        };
        (self.connection.description(), Style::default().fg(color))
    }
}
