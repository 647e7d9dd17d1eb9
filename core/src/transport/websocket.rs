//! WebSocket Transport
//!
//! Client-side connector for the remote assistant. After the handshake the
//! stream is split and two tasks bridge it to the [`Connection`] channels:
//!
//! - reader: frames -> `inbound` (text as-is, binary if valid UTF-8)
//! - writer: `outbound` -> text frames, then a close frame once `outbound`
//!   is dropped
//!
//! Any read error or close frame ends the reader, which closes `inbound`;
//! that is the only way the session learns the connection is gone.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::traits::{Connection, Connector};
use super::DEFAULT_CHANNEL_CAPACITY;
use crate::error::TransportError;

/// Connector for `ws://` and `wss://` endpoints
#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    /// Handshake timeout (`None` = wait forever)
    connect_timeout: Option<Duration>,
    /// Capacity of each connection channel
    capacity: usize,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl WebSocketConnector {
    /// Create a connector with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handshake timeout (`Duration::ZERO` disables it)
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Set the channel capacity for each direction
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Handshake timeout, if any
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

/// Check that `endpoint` is a WebSocket URL
///
/// # Errors
///
/// Returns `TransportError::InvalidEndpoint` when the URL does not parse or
/// its scheme is not `ws`/`wss`.
pub fn validate_endpoint(endpoint: &str) -> Result<(), TransportError> {
    let url = reqwest::Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("scheme must be ws or wss, got {other}"),
        }),
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<Connection, TransportError> {
        validate_endpoint(endpoint)?;

        let handshake = connect_async(endpoint);
        let (stream, _response) = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| {
                    TransportError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
                })??,
            None => handshake.await?,
        };

        let (mut sink, mut source) = stream.split();
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(self.capacity);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(self.capacity);

        // Reader: frames -> inbound
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Skipping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "Close frame received");
                        break;
                    }
                    // Ping/pong are answered by tungstenite itself
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "WebSocket read error");
                        break;
                    }
                };

                if inbound_tx.send(text).await.is_err() {
                    debug!("Inbound receiver dropped");
                    break;
                }
            }

            debug!("WebSocket reader finished");
        });

        // Writer: outbound -> frames
        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "WebSocket write error");
                    return;
                }
            }

            if let Err(e) = sink.close().await {
                debug!(error = %e, "Close handshake failed");
            }
        });

        info!(endpoint = %endpoint, "WebSocket connected");

        Ok(Connection::new(outbound_tx, inbound_rx))
    }
}
