//! Streaming Session
//!
//! Keeps exactly one logical connection to the remote assistant alive,
//! turns inbound units into [`SessionEvent`]s and reconnects after a fixed
//! delay whenever the connection ends for any reason other than
//! [`StreamingSession::close`].
//!
//! # Architecture
//!
//! ```text
//!   StreamingSession (handle)                 Driver task (sole owner)
//!   ─────────────────────────                 ────────────────────────
//!   send / connect / close  ── Command ──▶    endpoint, Connection,
//!   state()                 ◀── watch ───     reconnect timer, phase
//!   SessionEvents           ◀── mpsc ────     Fragment / TurnComplete / TurnFailed
//! ```
//!
//! All connection state lives in the driver, so there is nothing to lock and
//! reconnect/close races resolve in command order.
//!
//! # State Machine
//!
//! ```text
//!   Connecting ──ok──▶ Open ──remote close / error──▶ Closed
//!       │                                              │
//!       └────────────fail──────────────────────────────┤
//!                                                      │ fixed delay
//!   Connecting ◀───────────────────────────────────────┘
//!
//!   any ──close()──▶ Stopped
//! ```
//!
//! The reconnect timer only exists inside the `Closed` phase, so at most one
//! is ever pending. There is no retry cap and no backoff growth.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::protocol::InboundUnit;
use crate::transport::{Connection, Connector};

/// Delay between a close and the next connection attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Lifecycle of the session's connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Connected; sends are accepted
    Open,
    /// Disconnected; a reconnect is scheduled
    Closed,
    /// Torn down by `close()`; terminal
    Stopped,
}

impl ConnectionState {
    /// Whether sends are accepted
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the session will never connect again
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Short description for status displays
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Open => "Connected",
            Self::Closed => "Disconnected, retrying...",
            Self::Stopped => "Offline",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Something the remote assistant said
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A piece of reply text, delivered exactly as received
    Fragment(String),
    /// The end marker arrived; the turn is over
    TurnComplete,
    /// The error marker arrived; the turn is over and failed
    TurnFailed,
}

impl From<InboundUnit> for SessionEvent {
    fn from(unit: InboundUnit) -> Self {
        match unit {
            InboundUnit::Fragment(text) => Self::Fragment(text),
            InboundUnit::End => Self::TurnComplete,
            InboundUnit::Error => Self::TurnFailed,
        }
    }
}

/// Receiver of a session's events (single consumer, in receipt order)
pub type SessionEvents = mpsc::Receiver<SessionEvent>;

/// Tunables for a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Fixed delay before reconnecting
    pub reconnect_delay: Duration,
    /// Capacity of the event channel
    pub event_buffer: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

enum Command {
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Connect {
        endpoint: String,
    },
    Close,
}

/// Handle to a running streaming session
///
/// Construct one per conversation view with [`StreamingSession::start`] and
/// tear it down with [`StreamingSession::close`] (or by dropping it).
pub struct StreamingSession {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    /// The "do not reconnect" flag
    stop_requested: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
}

impl StreamingSession {
    /// Start a session and begin connecting to `endpoint`
    ///
    /// Connection failures are never returned here; they show up as a
    /// transition to [`ConnectionState::Closed`] followed by a retry.
    pub fn start(
        endpoint: impl Into<String>,
        connector: Arc<dyn Connector>,
        settings: SessionSettings,
    ) -> (Self, SessionEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(settings.event_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let stop_requested = Arc::new(AtomicBool::new(false));

        let driver = Driver {
            endpoint: endpoint.into(),
            connector,
            settings,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            stop_requested: Arc::clone(&stop_requested),
        };

        let handle = tokio::spawn(driver.run());

        let session = Self {
            commands: command_tx,
            state: state_rx,
            stop_requested,
            driver: Some(handle),
        };

        (session, event_rx)
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the connection is open right now
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Watch state transitions
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Send one opaque text unit to the assistant
    ///
    /// Nothing is queued: if the connection is not open at the moment the
    /// driver handles the request, the text is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotReady` if the connection is not open, or
    /// `SessionError::Closed` if the session has been torn down.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let (reply, result) = oneshot::channel();
        self.commands
            .send(Command::Send {
                text: text.into(),
                reply,
            })
            .map_err(|_| SessionError::Closed)?;

        result.await.map_err(|_| SessionError::Closed)?
    }

    /// Ask for a connection to `endpoint` now
    ///
    /// Cancels a pending reconnect timer. Ignored when already connecting to
    /// or connected to the same endpoint, or after `close()`.
    pub fn connect(&self, endpoint: impl Into<String>) {
        let _ = self.commands.send(Command::Connect {
            endpoint: endpoint.into(),
        });
    }

    /// Tear down the session; no reconnect will follow
    pub async fn close(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.commands.send(Command::Close);

        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "Session driver ended abnormally");
            }
        }
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingSession")
            .field("state", &self.state())
            .field("stop_requested", &self.stop_requested.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Phase of the driver loop
enum Phase {
    Connecting,
    Open(Connection),
    Closed,
    Stopped,
}

struct Driver {
    endpoint: String,
    connector: Arc<dyn Connector>,
    settings: SessionSettings,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::Sender<SessionEvent>,
    state: watch::Sender<ConnectionState>,
    stop_requested: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self) {
        let mut phase = Phase::Connecting;

        loop {
            phase = match phase {
                Phase::Connecting => self.connecting().await,
                Phase::Open(connection) => self.open(connection).await,
                Phase::Closed => self.closed().await,
                Phase::Stopped => break,
            };
        }

        self.transition(ConnectionState::Stopped);
        debug!("Session driver stopped");
    }

    fn transition(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
    }

    fn stopping(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn reject_send(reply: oneshot::Sender<Result<(), SessionError>>, state: ConnectionState) {
        debug!(%state, "Rejecting send: connection not open");
        let _ = reply.send(Err(SessionError::NotReady { state }));
    }

    async fn connecting(&mut self) -> Phase {
        if self.stopping() {
            return Phase::Stopped;
        }
        self.transition(ConnectionState::Connecting);

        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();
        let attempt = connector.connect(&endpoint);
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    None | Some(Command::Close) => return Phase::Stopped,
                    Some(Command::Send { reply, .. }) => {
                        Self::reject_send(reply, ConnectionState::Connecting);
                    }
                    Some(Command::Connect { endpoint: next }) => {
                        if next != self.endpoint {
                            info!(endpoint = %next, "Endpoint changed, restarting connection");
                            self.endpoint = next;
                            return Phase::Connecting;
                        }
                    }
                },

                result = &mut attempt => return match result {
                    Ok(connection) if self.stopping() => {
                        drop(connection);
                        Phase::Stopped
                    }
                    Ok(connection) => Phase::Open(connection),
                    Err(e) => {
                        warn!(endpoint = %self.endpoint, error = %e, "Connection attempt failed");
                        Phase::Closed
                    }
                },
            }
        }
    }

    async fn open(&mut self, mut connection: Connection) -> Phase {
        self.transition(ConnectionState::Open);
        info!(endpoint = %self.endpoint, "Connected to assistant");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    if let Some(next) = self.handle_open_command(command, &connection.outbound).await {
                        return next;
                    }
                }

                unit = connection.inbound.recv() => match unit {
                    Some(raw) => {
                        if let Some(next) = self.dispatch(raw, &connection.outbound).await {
                            return next;
                        }
                    }
                    None => return Phase::Closed,
                },
            }
        }
    }

    /// Apply a command received while open; `Some` leaves the open phase
    async fn handle_open_command(
        &mut self,
        command: Option<Command>,
        outbound: &mpsc::Sender<String>,
    ) -> Option<Phase> {
        match command {
            None | Some(Command::Close) => Some(Phase::Stopped),
            Some(Command::Send { text, reply }) => {
                if outbound.send(text).await.is_ok() {
                    let _ = reply.send(Ok(()));
                    None
                } else {
                    warn!("Write side of the connection is gone");
                    Self::reject_send(reply, ConnectionState::Closed);
                    Some(Phase::Closed)
                }
            }
            Some(Command::Connect { endpoint: next }) => {
                if next == self.endpoint {
                    return None;
                }
                info!(endpoint = %next, "Endpoint changed, reconnecting");
                self.endpoint = next;
                Some(Phase::Connecting)
            }
        }
    }

    /// Hand one inbound unit to the consumer
    ///
    /// Waits for room in the event channel while still serving commands, so
    /// a consumer that stops reading can't keep `close()` from finishing.
    async fn dispatch(&mut self, raw: String, outbound: &mpsc::Sender<String>) -> Option<Phase> {
        let unit = InboundUnit::classify(raw);
        if unit == InboundUnit::Error {
            warn!("Assistant reported an error generating the response");
        }

        let events = self.events.clone();
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    let next = self.handle_open_command(command, outbound).await;
                    if next.is_some() {
                        debug!("Leaving open phase, dropping undelivered inbound unit");
                        return next;
                    }
                }

                permit = events.reserve() => {
                    match permit {
                        Ok(permit) => permit.send(unit.into()),
                        Err(_) => debug!("Event receiver dropped, discarding inbound unit"),
                    }
                    return None;
                }
            }
        }
    }

    async fn closed(&mut self) -> Phase {
        if self.stopping() {
            return Phase::Stopped;
        }
        self.transition(ConnectionState::Closed);

        let delay = self.settings.reconnect_delay;
        warn!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Connection closed. Reconnecting in {:?}...",
            delay
        );

        // The one and only reconnect timer; dropping it cancels it.
        let timer = tokio::time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    None | Some(Command::Close) => return Phase::Stopped,
                    Some(Command::Send { reply, .. }) => {
                        Self::reject_send(reply, ConnectionState::Closed);
                    }
                    Some(Command::Connect { endpoint: next }) => {
                        debug!(endpoint = %next, "Reconnect requested, cancelling timer");
                        self.endpoint = next;
                        return Phase::Connecting;
                    }
                },

                () = &mut timer => return Phase::Connecting,
            }
        }
    }
}
