//! Wire Protocol
//!
//! The assistant stream is plain UTF-8 text. Every inbound unit is either a
//! fragment of the reply or one of two reserved sentinel strings. Matching is
//! exact: `" [END]"` or `"[end]"` are content, not control signals.

/// Marks the end of the current reply
pub const END_MARKER: &str = "[END]";

/// Marks a failed reply
pub const ERROR_MARKER: &str = "[ERROR]";

/// Classification of one inbound unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundUnit {
    /// Reply text to append to the conversation
    Fragment(String),
    /// The reply is complete
    End,
    /// The remote failed to produce a reply
    Error,
}

impl InboundUnit {
    /// Classify a raw inbound unit
    #[must_use]
    pub fn classify(raw: String) -> Self {
        match raw.as_str() {
            END_MARKER => Self::End,
            ERROR_MARKER => Self::Error,
            _ => Self::Fragment(raw),
        }
    }

    /// Whether this unit is a sentinel
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Fragment(_))
    }
}
