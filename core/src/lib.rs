//! Gigi Core - Streaming Chat Client Logic for Gigi the Robot
//!
//! This crate holds everything the Gigi chat client does that is not drawing
//! pixels: the conversation model, the self-healing connection to the remote
//! assistant, the chat turn bookkeeping, the history fetch and configuration.
//! Front-ends (the `gigi-tui` terminal client, tests, headless tools) drive it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Front-end (tui)                         │
//! │   input ──submit──▶ ChatController ◀──apply── SessionEvents   │
//! │                         │    ▲                    ▲           │
//! └─────────────────────────┼────┼────────────────────┼───────────┘
//!                           │    │ seed_history       │
//!                        send()  │                    │
//!                           ▼    │                    │
//! ┌──────────────────────────────┼────────────────────┼───────────┐
//! │                     GIGI CORE│                    │           │
//! │  ┌─────────────────┐   ┌─────┴─────────┐   ┌──────┴────────┐  │
//! │  │ StreamingSession│──▶│ HistoryClient │   │ Driver task   │  │
//! │  │     (handle)    │   │   (reqwest)   │   │ reconnect loop│  │
//! │  └────────┬────────┘   └───────────────┘   └──────┬────────┘  │
//! │           └──────────── commands ─────────────────┘           │
//! │                                                   │           │
//! │                              Connector (WebSocket / in-process)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use gigi_core::{load_config, ChatController, StreamingSession};
//!
//! let config = load_config()?;
//! let (session, mut events) = StreamingSession::start(
//!     config.stream_endpoint.clone(),
//!     Arc::new(config.connector()),
//!     config.session_settings(),
//! );
//!
//! let mut chat = ChatController::new();
//! chat.submit(&session, "2+2?").await;
//! while let Some(event) = events.recv().await {
//!     chat.apply(event);
//!     if !chat.is_loading() {
//!         break;
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`messages`]: `Role` and `Message`
//! - [`conversation`]: Ordered conversation buffer
//! - [`protocol`]: Wire sentinels (`[END]`, `[ERROR]`)
//! - [`transport`]: Connector trait, WebSocket and in-process connectors
//! - [`session`]: `StreamingSession` with automatic reconnect
//! - [`chat`]: `ChatController` (loading flag, send precondition, notices)
//! - [`history`]: Best-effort history fetch
//! - [`config`]: Environment + TOML + defaults
//! - [`error`]: Error enums
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use chat::{ChatController, Notice, SubmitOutcome};
pub use conversation::Conversation;
pub use error::{ConfigError, HistoryError, SessionError, TransportError};
pub use history::{parse_history, HistoryClient};
pub use messages::{Message, Role};
pub use protocol::{InboundUnit, END_MARKER, ERROR_MARKER};
pub use session::{
    ConnectionState, SessionEvent, SessionEvents, SessionSettings, StreamingSession,
    RECONNECT_DELAY,
};
pub use transport::{Connection, Connector, InProcessConnector, RemoteEnd, WebSocketConnector};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env, ConfigSource,
    GigiConfig, GigiToml,
};
