//! Gigi TUI - Terminal chat client for Gigi the Robot
//!
//! A full-screen terminal front-end over [`gigi_core`]: a scrollable
//! conversation with markdown and code block rendering, an auto-growing
//! prompt box, a loading indicator, connection status and timed notices.
//!
//! # Architecture
//!
//! - **App**: event loop over terminal input, session events and a frame tick
//! - **Display**: per-frame view model derived from the chat controller
//! - **Markdown**: block-level markdown to styled lines
//! - **Widgets**: the prompt input box

pub mod app;
pub mod display;
pub mod markdown;
pub mod theme;
pub mod widgets;

pub use app::App;
