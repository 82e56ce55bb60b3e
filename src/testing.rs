//! Test doubles and loopback helpers shared by unit tests.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::error::{Error, Result};
use crate::refresh::{Overlay, Renderer, UiPayload, UiSource};
use crate::transport::Transport;

/// Server side of a loopback WebSocket.
pub(crate) type Peer = WebSocketStream<TcpStream>;

// ============================================================================
// Logging
// ============================================================================

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Loopback Server
// ============================================================================

/// Binds a loopback WebSocket server; accepted sockets arrive on the channel.
pub(crate) async fn server() -> (String, mpsc::UnboundedReceiver<Peer>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                let _ = tx.send(ws);
            }
        }
    });

    (url, rx)
}

/// Returns an open transport and the server side of its socket.
pub(crate) async fn connected() -> (Transport, Peer) {
    let (url, mut accepted) = server().await;
    let transport = Transport::new();
    transport.connect(&url).await;
    let peer = accepted.recv().await.unwrap();
    (transport, peer)
}

/// Reads the next text frame from the client as JSON.
pub(crate) async fn next_frame(peer: &mut Peer) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), peer.next())
            .await
            .expect("frame within 5s")
            .expect("socket open")
            .expect("frame ok");

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Asserts the client sends nothing for a short while.
pub(crate) async fn assert_silent(peer: &mut Peer) {
    let frame = timeout(Duration::from_millis(150), peer.next()).await;
    assert!(frame.is_err(), "unexpected frame: {frame:?}");
}

/// Polls `condition` until it holds, failing after 5s.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition within 5s");
}

/// Pushes a text frame to the client.
pub(crate) async fn push(peer: &mut Peer, frame: Value) {
    peer.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

// ============================================================================
// StubSource
// ============================================================================

/// Scripted UI source.
#[derive(Default)]
pub(crate) struct StubSource {
    /// Status to fail with; `None` succeeds.
    pub fail_status: Option<u16>,
    /// Holds every fetch until notified.
    pub gate: Option<Arc<Notify>>,
    /// Fetches started.
    pub calls: AtomicUsize,
    /// Location passed to the last fetch.
    pub last_location: Mutex<Option<String>>,
}

impl StubSource {
    pub(crate) fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UiSource for StubSource {
    async fn fetch_ui(&self, location: Option<&str>) -> Result<UiPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_location.lock() = location.map(str::to_owned);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match self.fail_status {
            Some(status) => Err(Error::server_error(status)),
            None => Ok(UiPayload::new(json!({"type": "page", "children": []}))),
        }
    }
}

// ============================================================================
// RecordingRenderer
// ============================================================================

/// Renderer that remembers what it painted.
#[derive(Default)]
pub(crate) struct RecordingRenderer {
    pub rendered: Mutex<Vec<UiPayload>>,
    pub panic: bool,
}

impl RecordingRenderer {
    pub(crate) fn count(&self) -> usize {
        self.rendered.lock().len()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, payload: &UiPayload) -> Result<()> {
        if self.panic {
            panic!("renderer crashed");
        }
        self.rendered.lock().push(payload.clone());
        Ok(())
    }
}

// ============================================================================
// CountingOverlay
// ============================================================================

/// Overlay counting visibility transitions.
#[derive(Default)]
pub(crate) struct CountingOverlay {
    pub shows: AtomicUsize,
    pub hides: AtomicUsize,
}

impl CountingOverlay {
    pub(crate) fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub(crate) fn visible(&self) -> bool {
        self.shows() > self.hides.load(Ordering::SeqCst)
    }
}

impl Overlay for CountingOverlay {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
    }
}
