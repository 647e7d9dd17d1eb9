//! Chat Controller
//!
//! Glue between the user, the conversation and the streaming session. The
//! controller owns the conversation, the `loading` flag and a queue of
//! user-visible notices. Front-ends call [`ChatController::submit`] when the
//! user presses Enter and [`ChatController::apply`] for every session event,
//! then render whatever state the controller holds.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::error::SessionError;
use crate::messages::Message;
use crate::session::{SessionEvent, StreamingSession};

/// One-shot notification for the user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notice {
    /// A submit was attempted while the connection was not open
    NotConnected,
    /// The assistant sent the error marker
    GenerationFailed,
}

impl Notice {
    /// Text shown to the user
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::NotConnected => "WebSocket is not connected. Please wait...",
            Self::GenerationFailed => "Error generating response.",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// What happened to a submitted input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, or a reply is still streaming
    Ignored,
    /// The connection was not open; a notice was raised
    Rejected,
    /// The prompt went out and a new turn began
    Sent,
}

/// Conversation plus turn bookkeeping
#[derive(Debug, Default)]
pub struct ChatController {
    conversation: Conversation,
    loading: bool,
    notices: VecDeque<Notice>,
}

impl ChatController {
    /// Create a controller with an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation so far
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether a reply is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether any notices are waiting to be shown
    #[must_use]
    pub fn has_notices(&self) -> bool {
        !self.notices.is_empty()
    }

    /// Send `input` as the next prompt
    ///
    /// On `Sent` the conversation gains the user message and an empty
    /// assistant placeholder, and `loading` is set until the turn ends.
    pub async fn submit(&mut self, session: &StreamingSession, input: &str) -> SubmitOutcome {
        if input.trim().is_empty() || self.loading {
            return SubmitOutcome::Ignored;
        }

        if !session.is_open() {
            self.notices.push_back(Notice::NotConnected);
            return SubmitOutcome::Rejected;
        }

        match session.send(input).await {
            Ok(()) => {
                self.conversation.begin_turn(input);
                self.loading = true;
                SubmitOutcome::Sent
            }
            Err(SessionError::NotReady { state }) => {
                debug!(%state, "Connection changed state before send");
                self.notices.push_back(Notice::NotConnected);
                SubmitOutcome::Rejected
            }
            Err(SessionError::Closed) => {
                debug!("Session already closed");
                self.notices.push_back(Notice::NotConnected);
                SubmitOutcome::Rejected
            }
        }
    }

    /// Fold one session event into the conversation
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Fragment(text) => {
                self.conversation.append_fragment(&text);
            }
            SessionEvent::TurnComplete => {
                self.loading = false;
            }
            SessionEvent::TurnFailed => {
                self.loading = false;
                self.notices.push_back(Notice::GenerationFailed);
            }
        }
    }

    /// Replace the conversation with previously stored messages
    ///
    /// Only applies while the conversation is still empty. History that
    /// arrives after the first prompt is discarded so it can't overwrite the
    /// turn in progress. Returns whether the history was used.
    pub fn seed_history(&mut self, messages: Vec<Message>) -> bool {
        if !self.conversation.is_empty() {
            debug!("Conversation already started, ignoring late history");
            return false;
        }
        if messages.is_empty() {
            return false;
        }

        info!(count = messages.len(), "Loaded previous conversation");
        self.conversation = Conversation::from_history(messages);
        true
    }

    /// Drain pending notices, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::messages::Role;
    use crate::protocol::{END_MARKER, ERROR_MARKER};
    use crate::session::{ConnectionState, SessionEvents, SessionSettings};
    use crate::transport::{InProcessConnector, RemoteEnd};

    async fn connected() -> (StreamingSession, SessionEvents, RemoteEnd) {
        let (connector, mut remotes) = InProcessConnector::new();
        let (session, events) = StreamingSession::start(
            "ws://gigi.test",
            Arc::new(connector),
            SessionSettings::default(),
        );
        let remote = remotes.recv().await.unwrap();
        session
            .subscribe_state()
            .wait_for(|s| *s == ConnectionState::Open)
            .await
            .unwrap();
        (session, events, remote)
    }

    #[tokio::test]
    async fn test_full_turn() {
        let (session, mut events, mut remote) = connected().await;
        let mut chat = ChatController::new();

        assert_eq!(chat.submit(&session, "2+2?").await, SubmitOutcome::Sent);
        assert!(chat.is_loading());
        assert_eq!(remote.recv().await.as_deref(), Some("2+2?"));

        remote.push("4").await;
        remote.push(END_MARKER).await;
        for _ in 0..2 {
            chat.apply(events.recv().await.unwrap());
        }

        assert!(!chat.is_loading());
        assert_eq!(
            chat.conversation().messages(),
            &[Message::user("2+2?"), Message::assistant("4")]
        );
        assert!(chat.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_blank_and_loading_inputs_ignored() {
        let (session, _events, _remote) = connected().await;
        let mut chat = ChatController::new();

        assert_eq!(chat.submit(&session, "   \n").await, SubmitOutcome::Ignored);
        assert!(chat.conversation().is_empty());

        assert_eq!(chat.submit(&session, "first").await, SubmitOutcome::Sent);
        assert_eq!(chat.submit(&session, "second").await, SubmitOutcome::Ignored);
        assert_eq!(chat.conversation().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_while_disconnected_raises_one_notice() {
        let (connector, _remotes) = InProcessConnector::new();
        connector.refuse_all(true);
        let (session, _events) = StreamingSession::start(
            "ws://gigi.test",
            Arc::new(connector),
            SessionSettings::default(),
        );
        let mut chat = ChatController::new();

        assert_eq!(chat.submit(&session, "hello").await, SubmitOutcome::Rejected);
        assert!(chat.conversation().is_empty());
        assert!(!chat.is_loading());
        assert_eq!(chat.take_notices(), vec![Notice::NotConnected]);
        assert!(chat.take_notices().is_empty());
    }

    #[test]
    fn test_error_marker_ends_turn_with_notice() {
        let mut chat = ChatController::new();
        chat.conversation.begin_turn("hi");
        chat.loading = true;

        chat.apply(SessionEvent::Fragment("partial".into()));
        chat.apply(SessionEvent::TurnFailed);

        assert!(!chat.is_loading());
        assert_eq!(chat.take_notices(), vec![Notice::GenerationFailed]);
        assert_eq!(chat.conversation().last(), Some(&Message::assistant("partial")));
    }

    #[test]
    fn test_sentinels_leave_content_alone() {
        let mut chat = ChatController::new();
        chat.conversation.begin_turn("hi");

        chat.apply(SessionEvent::TurnComplete);
        chat.apply(SessionEvent::TurnFailed);

        let last = chat.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "");
        assert!(!last.content.contains(END_MARKER));
        assert!(!last.content.contains(ERROR_MARKER));
    }

    #[test]
    fn test_seed_history_only_when_empty() {
        let mut chat = ChatController::new();
        let history = vec![Message::user("hi"), Message::assistant("hello")];

        assert!(chat.seed_history(history.clone()));
        assert_eq!(chat.conversation().messages(), history.as_slice());

        assert!(!chat.seed_history(vec![Message::user("late")]));
        assert_eq!(chat.conversation().len(), 2);
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(
            Notice::NotConnected.to_string(),
            "WebSocket is not connected. Please wait..."
        );
        assert_eq!(Notice::GenerationFailed.text(), "Error generating response.");
    }
}
