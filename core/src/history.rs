//! Conversation History
//!
//! Best-effort fetch of the previous conversation from the history endpoint.
//! The endpoint answers a plain GET with a JSON array of
//! `{ "role": "user" | "assistant", "content": "..." }` records. Anything
//! else (a non-2xx status, a transport error, a non-array body or a record
//! that does not fit) means there is no usable history.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::HistoryError;
use crate::messages::Message;

/// Default timeout for the history request
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the history endpoint
#[derive(Clone, Debug)]
pub struct HistoryClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl Default for HistoryClient {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TIMEOUT)
    }
}

impl HistoryClient {
    /// Create a client whose requests give up after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Request timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the stored conversation
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures, non-success statuses and
    /// bodies that are not a JSON array of messages.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Message>, HistoryError> {
        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status));
        }

        let body = response.text().await?;
        let messages = parse_history(&body)?;
        debug!(url = %url, count = messages.len(), "Fetched conversation history");
        Ok(messages)
    }

    /// Fetch the stored conversation, treating every failure as "none"
    pub async fn load(&self, url: &str) -> Vec<Message> {
        match self.fetch(url).await {
            Ok(messages) => messages,
            Err(e) => {
                info!(url = %url, error = %e, "No previous conversation found");
                Vec::new()
            }
        }
    }
}

/// Parse a history response body
///
/// # Errors
///
/// Returns `HistoryError::Json` if the body is not JSON or a record is
/// malformed, and `HistoryError::Shape` if the top level is not an array.
pub fn parse_history(body: &str) -> Result<Vec<Message>, HistoryError> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if !value.is_array() {
        let kind = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Object(_) => "an object",
            serde_json::Value::Array(_) => "an array",
        };
        return Err(HistoryError::Shape(format!("expected an array, got {kind}")));
    }

    Ok(serde_json::from_value(value)?)
}
