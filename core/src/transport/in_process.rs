//! In-Process Transport
//!
//! Channel-backed connector with no network. Each successful `connect` hands
//! the caller a [`RemoteEnd`] playing the part of the assistant service:
//! push fragments and sentinels into it, read what the client sent, drop it
//! to simulate the server going away.
//!
//! # Usage
//!
//! ```ignore
//! let (connector, mut remotes) = InProcessConnector::new();
//! let (session, events) = StreamingSession::start("ws://gigi.test", Arc::new(connector.clone()), settings);
//!
//! let remote = remotes.recv().await.unwrap();
//! remote.push("4").await;
//! remote.push(END_MARKER).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::traits::{Connection, Connector};
use super::DEFAULT_CHANNEL_CAPACITY;
use crate::error::TransportError;

/// Record of one connection attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectAttempt {
    /// Endpoint the session tried
    pub endpoint: String,
    /// When the attempt happened (tokio clock, so paused-time tests work)
    pub at: Instant,
    /// Whether the attempt was accepted
    pub accepted: bool,
}

#[derive(Debug)]
struct Shared {
    /// Where accepted connections are delivered
    remotes: mpsc::UnboundedSender<RemoteEnd>,
    /// Remaining attempts to refuse
    refuse_remaining: usize,
    /// Refuse every attempt regardless of the counter
    refuse_all: bool,
    /// Every attempt so far
    attempts: Vec<ConnectAttempt>,
}

/// Connector that pairs each connection with a caller-driven [`RemoteEnd`]
#[derive(Clone, Debug)]
pub struct InProcessConnector {
    shared: Arc<Mutex<Shared>>,
}

impl InProcessConnector {
    /// Create a connector and the receiver of its remote ends
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        let connector = Self {
            shared: Arc::new(Mutex::new(Shared {
                remotes,
                refuse_remaining: 0,
                refuse_all: false,
                attempts: Vec::new(),
            })),
        };
        (connector, rx)
    }

    /// Refuse the next `count` connection attempts
    pub fn refuse_next(&self, count: usize) {
        self.shared.lock().refuse_remaining = count;
    }

    /// Refuse (or stop refusing) every attempt
    pub fn refuse_all(&self, refuse: bool) {
        self.shared.lock().refuse_all = refuse;
    }

    /// Every attempt made so far, oldest first
    #[must_use]
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.shared.lock().attempts.clone()
    }

    /// Number of attempts made so far
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.shared.lock().attempts.len()
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    async fn connect(&self, endpoint: &str) -> Result<Connection, TransportError> {
        let mut shared = self.shared.lock();

        let refuse = if shared.refuse_all {
            true
        } else if shared.refuse_remaining > 0 {
            shared.refuse_remaining -= 1;
            true
        } else {
            false
        };

        shared.attempts.push(ConnectAttempt {
            endpoint: endpoint.to_string(),
            at: Instant::now(),
            accepted: !refuse,
        });

        if refuse {
            return Err(TransportError::ConnectionFailed(format!(
                "{endpoint} refused the connection"
            )));
        }

        let (to_client, inbound) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        let (outbound, from_client) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

        let remote = RemoteEnd {
            endpoint: endpoint.to_string(),
            to_client,
            from_client,
        };
        shared
            .remotes
            .send(remote)
            .map_err(|_| TransportError::ConnectionFailed("no listener for remote ends".into()))?;

        Ok(Connection::new(outbound, inbound))
    }
}

/// The assistant's side of an in-process connection
#[derive(Debug)]
pub struct RemoteEnd {
    endpoint: String,
    to_client: mpsc::Sender<String>,
    from_client: mpsc::Receiver<String>,
}

impl RemoteEnd {
    /// Endpoint the client connected to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliver one inbound unit to the client
    ///
    /// Returns `false` if the client side is gone.
    pub async fn push(&self, unit: impl Into<String>) -> bool {
        self.to_client.send(unit.into()).await.is_ok()
    }

    /// Next unit the client sent, or `None` once the client hung up
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Whether the client has dropped its side
    #[must_use]
    pub fn is_client_closed(&self) -> bool {
        self.to_client.is_closed()
    }

    /// Close the connection from the remote side
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let (connector, mut remotes) = InProcessConnector::new();
        let mut conn = connector.connect("ws://gigi.test").await.unwrap();
        let mut remote = remotes.recv().await.unwrap();

        assert_eq!(remote.endpoint(), "ws://gigi.test");

        conn.outbound.send("hi".into()).await.unwrap();
        assert_eq!(remote.recv().await.as_deref(), Some("hi"));

        assert!(remote.push("hello").await);
        assert_eq!(conn.inbound.recv().await.as_deref(), Some("hello"));

        remote.close();
        assert_eq!(conn.inbound.recv().await, None);
    }

    #[tokio::test]
    async fn test_refuse_next() {
        let (connector, _remotes) = InProcessConnector::new();
        connector.refuse_next(2);

        assert!(connector.connect("ws://a").await.is_err());
        assert!(connector.connect("ws://a").await.is_err());
        assert!(connector.connect("ws://a").await.is_ok());

        let accepted: Vec<_> = connector.attempts().iter().map(|a| a.accepted).collect();
        assert_eq!(accepted, vec![false, false, true]);
    }

    #[tokio::test]
    async fn test_client_drop_visible_to_remote() {
        let (connector, mut remotes) = InProcessConnector::new();
        let conn = connector.connect("ws://a").await.unwrap();
        let mut remote = remotes.recv().await.unwrap();

        drop(conn);
        assert!(remote.is_client_closed());
        assert_eq!(remote.recv().await, None);
    }
}
