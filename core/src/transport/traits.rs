//! Transport Traits
//!
//! A [`Connector`] opens connections; a [`Connection`] is a pair of channels
//! carrying opaque UTF-8 units in each direction.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// One live, full-duplex, message-oriented connection
///
/// The connection is over once `inbound` yields `None`. Dropping the whole
/// value (or just `outbound`) asks the remote side to close.
#[derive(Debug)]
pub struct Connection {
    /// Units sent to the remote assistant
    pub outbound: mpsc::Sender<String>,
    /// Units received from the remote assistant, in receipt order
    pub inbound: mpsc::Receiver<String>,
}

impl Connection {
    /// Build a connection from its two channel halves
    #[must_use]
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Self {
        Self { outbound, inbound }
    }
}

/// Opens connections to the remote assistant
///
/// Implementations must not retry on their own; the session decides when to
/// try again.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a connection to `endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the handshake fails.
    async fn connect(&self, endpoint: &str) -> Result<Connection, TransportError>;
}
