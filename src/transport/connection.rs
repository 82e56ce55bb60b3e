//! WebSocket connection and event loop.
//!
//! One [`Connection`] wraps one live socket. It spawns a tokio task that
//! owns the stream and handles:
//!
//! - Incoming text frames, forwarded to the owning transport
//! - Outgoing text frames queued by the transport, in FIFO order, acknowledged
//!   once written when the sender waits
//! - Shutdown requests
//! - Reporting the end of the socket exactly once
//!
//! The loop does not read anything until the owner releases it through the
//! `opened` gate, so no frame can overtake the `Opened` lifecycle event.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

// ============================================================================
// Types
// ============================================================================

/// What the event loop reports back to its owner.
#[derive(Debug)]
pub(crate) enum Signal {
    /// A text frame arrived.
    Frame(String),
    /// The socket is gone. Sent once, as the loop's last act.
    Lost {
        /// Close code from the peer's close frame.
        code: Option<u16>,
        /// Socket error that ended the loop, if any.
        error: Option<Error>,
    },
}

/// Callback receiving loop signals.
pub(crate) type SignalHandler = Box<dyn Fn(Signal) + Send + Sync>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame, reporting the outcome if anyone is waiting.
    Send {
        text: String,
        ack_tx: Option<oneshot::Sender<Result<()>>>,
    },
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one live WebSocket.
///
/// Cloning is cheap; all clones talk to the same event loop.
#[derive(Clone)]
pub struct Connection {
    /// Generation this socket belongs to.
    id: ConnectionId,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Creates a connection from an established WebSocket stream.
    ///
    /// Spawns the event loop, which idles until `opened` fires. Dropping
    /// the gate sender closes the socket without reporting anything.
    pub(crate) fn new<S>(
        ws_stream: WebSocketStream<S>,
        id: ConnectionId,
        handler: SignalHandler,
        opened: oneshot::Receiver<()>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run_event_loop(
            ws_stream, id, command_rx, handler, opened,
        ));

        Self { id, command_tx }
    }

    /// Returns the generation this connection belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Writes a text frame and waits until it is flushed to the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has ended
    /// - [`Error::Connection`] if the write failed
    pub async fn send_text(&self, text: String) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                text,
                ack_tx: Some(ack_tx),
            })
            .map_err(|_| Error::ConnectionClosed)?;

        ack_rx.await?
    }

    /// Queues a text frame without waiting for the write.
    ///
    /// Frames are written in the order they are queued, interleaved in
    /// order with [`Connection::send_text`] writes. A failed write is only
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has ended.
    pub fn queue_text(&self, text: String) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send { text, ack_tx: None })
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Asks the event loop to close the socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop already ended.
    pub fn close(&self) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Shutdown)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        id: ConnectionId,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        handler: SignalHandler,
        opened: oneshot::Receiver<()>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        if opened.await.is_err() {
            debug!(%id, "Connection superseded before open");
            let _ = ws_write.close().await;
            return;
        }

        let mut code = None;
        let mut error = None;

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(%id, len = text.len(), "Frame received");
                            handler(Signal::Frame(text.to_string()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            code = frame.map(|f| u16::from(f.code));
                            debug!(%id, ?code, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(%id, error = %e, "WebSocket error");
                            error = Some(Error::WebSocket(e));
                            break;
                        }

                        None => {
                            debug!(%id, "WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { text, ack_tx }) => {
                            let result = ws_write
                                .send(Message::Text(text.into()))
                                .await
                                .map_err(|e| Error::connection(e.to_string()));
                            match ack_tx {
                                Some(ack_tx) => {
                                    let _ = ack_tx.send(result);
                                }
                                None => {
                                    if let Err(e) = result {
                                        warn!(%id, error = %e, "Queued write failed");
                                    }
                                }
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(%id, "Shutdown command received");
                            if let Err(e) = ws_write.close().await {
                                debug!(%id, error = %e, "Close handshake failed");
                            }
                            break;
                        }

                        None => {
                            debug!(%id, "Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        // Fail writes queued behind the exit
        command_rx.close();
        while let Ok(command) = command_rx.try_recv() {
            if let ConnectionCommand::Send {
                ack_tx: Some(ack_tx),
                ..
            } = command
            {
                let _ = ack_tx.send(Err(Error::ConnectionClosed));
            }
        }

        handler(Signal::Lost { code, error });

        debug!(%id, "Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::{accept_async, connect_async};

    /// Returns a connected (client, server) pair over loopback.
    async fn socket_pair() -> (
        WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
        WebSocketStream<TcpStream>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            accept_async(stream).await.unwrap()
        });

        let (client, _) = connect_async(url.as_str()).await.unwrap();
        (client, server.await.unwrap())
    }

    #[tokio::test]
    async fn test_frames_wait_for_gate() {
        let (client, mut server) = socket_pair().await;
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (open_tx, open_rx) = oneshot::channel();

        let _connection = Connection::new(
            client,
            ConnectionId::next(),
            Box::new(move |signal| {
                let _ = signal_tx.send(signal);
            }),
            open_rx,
        );

        server.send(Message::Text("early".to_string().into())).await.unwrap();
        assert!(
            timeout(Duration::from_millis(100), signal_rx.recv())
                .await
                .is_err()
        );

        open_tx.send(()).unwrap();
        let signal = timeout(Duration::from_secs(5), signal_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(signal, Signal::Frame(text) if text == "early"));
    }

    #[tokio::test]
    async fn test_send_and_remote_close() {
        let (client, mut server) = socket_pair().await;
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (open_tx, open_rx) = oneshot::channel();

        let connection = Connection::new(
            client,
            ConnectionId::next(),
            Box::new(move |signal| {
                let _ = signal_tx.send(signal);
            }),
            open_rx,
        );
        open_tx.send(()).unwrap();

        connection.send_text("hello".into()).await.unwrap();
        let received = server.next().await.unwrap().unwrap();
        assert_eq!(received, Message::Text("hello".to_string().into()));

        server.close(None).await.unwrap();
        let signal = timeout(Duration::from_secs(5), signal_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(signal, Signal::Lost { error: None, .. }));

        let err = connection.send_text("late".into()).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_queued_frames_keep_order() {
        let (client, mut server) = socket_pair().await;
        let (open_tx, open_rx) = oneshot::channel();

        let connection = Connection::new(
            client,
            ConnectionId::next(),
            Box::new(|_: Signal| {}),
            open_rx,
        );

        connection.queue_text("one".into()).unwrap();
        connection.queue_text("two".into()).unwrap();
        open_tx.send(()).unwrap();
        connection.send_text("three".into()).await.unwrap();

        for expected in ["one", "two", "three"] {
            let received = server.next().await.unwrap().unwrap();
            assert_eq!(received, Message::Text(expected.to_string().into()));
        }
    }

    #[tokio::test]
    async fn test_dropped_gate_closes_silently() {
        let (client, mut server) = socket_pair().await;
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let (open_tx, open_rx) = oneshot::channel::<()>();

        let _connection = Connection::new(
            client,
            ConnectionId::next(),
            Box::new(move |signal| {
                let _ = signal_tx.send(signal);
            }),
            open_rx,
        );
        drop(open_tx);

        let frame = timeout(Duration::from_secs(5), server.next()).await.unwrap();
        assert!(!matches!(frame, Some(Ok(Message::Text(_)))));
        assert!(signal_rx.recv().await.is_none());
    }
}
