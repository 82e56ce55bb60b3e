//! Transport owning the single live connection.
//!
//! [`Transport`] holds at most one [`Connection`] at a time. Connecting
//! while a connection exists closes the old one first, and every signal
//! from a superseded socket is discarded. This exclusivity keeps a frame
//! from ever being delivered twice.
//!
//! Listeners registered with [`Transport::subscribe`] receive
//! [`TransportEvent`]s in the order the transport produces them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::OutboundMessage;

use super::connection::{Connection, Signal, SignalHandler};
use super::event::{ConnectionState, EventListener, TransportEvent};

// ============================================================================
// Types
// ============================================================================

/// The single connection slot.
#[derive(Default)]
struct Slot {
    /// Current lifecycle state.
    state: ConnectionState,
    /// Generation allowed to report; `None` when idle.
    current: Option<ConnectionId>,
    /// Live socket handle once open.
    connection: Option<Connection>,
}

/// Internal shared state for a transport.
#[derive(Default)]
pub(crate) struct TransportInner {
    /// Connection slot.
    slot: Mutex<Slot>,
    /// Registered lifecycle listeners.
    listeners: RwLock<Vec<EventListener>>,
}

// ============================================================================
// Transport
// ============================================================================

/// Owner of the duplex connection to the UI server.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use cacao_sync::{OutboundMessage, Transport, TransportEvent};
///
/// # async fn example() -> cacao_sync::Result<()> {
/// let transport = Transport::new();
/// transport.subscribe(Arc::new(|event: &TransportEvent| {
///     println!("{event:?}");
/// }));
///
/// transport.connect("ws://localhost:1633").await;
/// transport.send(&OutboundMessage::Refresh).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Transport {
    /// Shared inner state.
    inner: Arc<TransportInner>,
}

/// Non-owning handle to a [`Transport`].
#[derive(Clone, Default)]
pub struct WeakTransport {
    inner: Weak<TransportInner>,
}

impl WeakTransport {
    /// Upgrades to a [`Transport`] if it is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Transport> {
        self.inner.upgrade().map(|inner| Transport { inner })
    }
}

// ============================================================================
// Transport - Display
// ============================================================================

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("Transport")
            .field("state", &slot.state)
            .field("current", &slot.current)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport - Public API
// ============================================================================

impl Transport {
    /// Creates a disconnected transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a non-owning handle.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakTransport {
        WeakTransport {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionState {
        self.inner.slot.lock().state
    }

    /// Registers a lifecycle listener.
    pub fn subscribe(&self, listener: EventListener) {
        self.inner.listeners.write().push(listener);
    }

    /// Connects to `url`, replacing any existing connection.
    ///
    /// Never fails: an unusable URL or a refused handshake is reported as
    /// [`TransportEvent::Errored`] followed by an unexpected
    /// [`TransportEvent::Closed`].
    pub async fn connect(&self, url: &str) {
        let id = ConnectionId::next();

        let previous = {
            let mut slot = self.inner.slot.lock();
            slot.current = Some(id);
            slot.state = ConnectionState::Connecting;
            slot.connection.take()
        };

        if let Some(previous) = previous
            && let Err(e) = previous.close()
        {
            debug!(id = %previous.id(), error = %e, "Error closing existing connection");
        }

        info!(%id, url, "Connecting to WebSocket server");

        let target = match parse_ws_url(url) {
            Ok(target) => target,
            Err(e) => {
                self.fail(id, e);
                return;
            }
        };

        match connect_async(target.as_str()).await {
            Ok((ws_stream, _response)) => {
                let weak = Arc::downgrade(&self.inner);
                let handler: SignalHandler = Box::new(move |signal: Signal| {
                    if let Some(inner) = weak.upgrade() {
                        Transport { inner }.on_signal(id, signal);
                    }
                });

                let (open_tx, open_rx) = oneshot::channel();
                let connection = Connection::new(ws_stream, id, handler, open_rx);

                {
                    let mut slot = self.inner.slot.lock();
                    if slot.current != Some(id) {
                        debug!(%id, "Connect superseded during handshake");
                        // Dropping the gate closes the socket
                        return;
                    }
                    slot.connection = Some(connection);
                    slot.state = ConnectionState::Open;
                }

                info!(%id, "Connected to WebSocket server");
                self.emit(&TransportEvent::Opened);
                let _ = open_tx.send(());
            }
            Err(e) => self.fail(id, Error::WebSocket(e)),
        }
    }

    /// Sends a message over the open connection.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the state is not [`ConnectionState::Open`]
    /// - [`Error::Json`] if the message cannot be encoded
    /// - [`Error::Connection`] or [`Error::ConnectionClosed`] if the write fails
    pub async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let connection = {
            let slot = self.inner.slot.lock();
            match (&slot.connection, slot.state) {
                (Some(connection), ConnectionState::Open) => connection.clone(),
                _ => return Err(Error::NotConnected),
            }
        };

        let text = message.encode()?;
        connection.send_text(text).await?;

        trace!(id = %connection.id(), action = message.action(), "Message sent");
        Ok(())
    }

    /// Queues a message on the open connection without waiting for the write.
    ///
    /// Messages queued from one thread reach the socket in call order.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the state is not [`ConnectionState::Open`]
    /// - [`Error::Json`] if the message cannot be encoded
    /// - [`Error::ConnectionClosed`] if the event loop has ended
    pub fn enqueue(&self, message: &OutboundMessage) -> Result<()> {
        let text = message.encode()?;

        let slot = self.inner.slot.lock();
        let connection = match (&slot.connection, slot.state) {
            (Some(connection), ConnectionState::Open) => connection,
            _ => return Err(Error::NotConnected),
        };
        connection.queue_text(text)?;

        trace!(id = %connection.id(), action = message.action(), "Message queued");
        Ok(())
    }

    /// Closes the connection on request.
    ///
    /// Listeners see [`TransportEvent::Closed`] with `requested: true` once
    /// the socket is gone. No-op when already disconnected.
    pub fn close(&self) {
        let (connection, aborted_handshake) = {
            let mut slot = self.inner.slot.lock();
            match slot.state {
                ConnectionState::Open => {
                    slot.state = ConnectionState::Closing;
                    (slot.connection.take(), false)
                }
                ConnectionState::Connecting => {
                    slot.state = ConnectionState::Disconnected;
                    slot.current = None;
                    (None, true)
                }
                ConnectionState::Closing | ConnectionState::Disconnected => return,
            }
        };

        if let Some(connection) = connection {
            debug!(id = %connection.id(), "Closing connection");
            if let Err(e) = connection.close() {
                debug!(id = %connection.id(), error = %e, "Close request failed");
            }
        }

        if aborted_handshake {
            debug!("Handshake aborted by close");
            self.emit(&TransportEvent::Closed {
                code: None,
                requested: true,
            });
        }
    }
}

// ============================================================================
// Transport - Signal Handling
// ============================================================================

impl Transport {
    /// Handles a signal from a connection's event loop.
    fn on_signal(&self, id: ConnectionId, signal: Signal) {
        match signal {
            Signal::Frame(text) => {
                let current = {
                    let slot = self.inner.slot.lock();
                    slot.current == Some(id) && slot.state.is_open()
                };

                if current {
                    self.emit(&TransportEvent::MessageReceived(text));
                } else {
                    trace!(%id, "Dropped frame from stale connection");
                }
            }

            Signal::Lost { code, error } => {
                let requested = {
                    let mut slot = self.inner.slot.lock();
                    if slot.current != Some(id) {
                        trace!(%id, "Ignored close of stale connection");
                        return;
                    }
                    let requested = slot.state == ConnectionState::Closing;
                    slot.state = ConnectionState::Disconnected;
                    slot.current = None;
                    slot.connection = None;
                    requested
                };

                info!(%id, ?code, requested, "WebSocket connection closed");

                if let Some(error) = error
                    && !requested
                {
                    self.emit(&TransportEvent::Errored(error));
                }
                self.emit(&TransportEvent::Closed { code, requested });
            }
        }
    }

    /// Reports a failed connect attempt.
    fn fail(&self, id: ConnectionId, error: Error) {
        {
            let mut slot = self.inner.slot.lock();
            if slot.current != Some(id) {
                debug!(%id, error = %error, "Superseded connect failed");
                return;
            }
            slot.state = ConnectionState::Disconnected;
            slot.current = None;
        }

        warn!(%id, error = %error, "Error creating WebSocket");
        self.emit(&TransportEvent::Errored(error));
        self.emit(&TransportEvent::Closed {
            code: None,
            requested: false,
        });
    }

    /// Delivers an event to every listener.
    fn emit(&self, event: &TransportEvent) {
        let listeners = self.inner.listeners.read().clone();
        for listener in &listeners {
            listener(event);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Validates a WebSocket URL.
fn parse_ws_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(url, e.to_string()))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(parsed),
        scheme => Err(Error::invalid_url(
            url,
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================
