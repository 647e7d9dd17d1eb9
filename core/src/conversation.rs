//! Conversation Buffer
//!
//! Ordered, append-only sequence of [`Message`]s, oldest first.
//!
//! The buffer has exactly two writers: the chat controller starting a turn
//! (`begin_turn`) and the stream of fragments for that turn
//! (`append_fragment`). Both run on the same task, so no locking is needed.
//!
//! While a reply is in flight the last entry is always the assistant message
//! being streamed. Blank assistant entries stay in the sequence (indices are
//! stable) but [`Conversation::visible`] skips them.

use crate::messages::Message;

/// The conversation thread shown to the user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation from previously stored messages
    #[must_use]
    pub fn from_history(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Start a new turn: the user's prompt followed by an empty reply
    pub fn begin_turn(&mut self, prompt: impl Into<String>) {
        self.messages.push(Message::user(prompt));
        self.messages.push(Message::assistant(""));
    }

    /// Append a streamed fragment to the last message
    ///
    /// The last message is replaced by a new value carrying the concatenated
    /// content. Returns `false` (and changes nothing) when the conversation is
    /// empty.
    pub fn append_fragment(&mut self, fragment: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                *last = last.with_appended(fragment);
                true
            }
            None => {
                tracing::debug!("Dropping fragment: conversation is empty");
                false
            }
        }
    }

    /// Messages that should be rendered
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.is_placeholder())
    }

    /// All messages, including hidden placeholders
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterate over all messages
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The most recent message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages (including placeholders)
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
