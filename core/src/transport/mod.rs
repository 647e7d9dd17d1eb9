//! Transport Layer for the Assistant Stream
//!
//! Separates the connection mechanism from the session state machine:
//! - `WebSocket`: the real remote assistant (`ws://` / `wss://`)
//! - `InProcess`: channel pairs driven by the caller (tests, offline demos)
//!
//! A transport only knows how to open one [`Connection`]. Reconnecting,
//! sentinel handling and state tracking all live in
//! [`crate::session::StreamingSession`].

pub mod in_process;
pub mod traits;
pub mod websocket;

pub use in_process::{ConnectAttempt, InProcessConnector, RemoteEnd};
pub use traits::{Connection, Connector};
pub use websocket::{validate_endpoint, WebSocketConnector};

/// Channel capacity used for each direction of a connection
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
