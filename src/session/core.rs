//! Sync session: the public face of the agent.
//!
//! A [`SyncSession`] owns one transport, its reconnection supervisor, the
//! state synchronizer and the refresh coordinator, and wires them together
//! through listeners:
//!
//! ```text
//! Transport ──Opened──────────► bootstrap sync
//!           ──MessageReceived─► decode ─► ui_update ─► replace state
//!           │                                         └► refresh
//!           └─Closed/Errored──► Supervisor (backoff)
//! Navigator ──navigate────────► sync_state
//! ```
//!
//! Every public operation contains its own failures: errors are logged and
//! reported as an outcome value, never returned to the caller.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};

use crate::protocol::{InboundFrame, OutboundMessage, SharedState};
use crate::refresh::{Overlay, RefreshCoordinator, RefreshOutcome, Renderer, UiSource};
use crate::supervisor::{Supervisor, SupervisorState};
use crate::sync::{Navigator, StateSynchronizer, SyncOutcome};
use crate::transport::{ConnectionState, Transport, TransportEvent};

use super::builder::SessionBuilder;
use super::options::SessionOptions;

// ============================================================================
// ServerRefresh
// ============================================================================

/// Route taken by [`SyncSession::request_server_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRefresh {
    /// Asked the server over the socket; the answer arrives as a frame.
    Requested,
    /// Socket unavailable; fetched over HTTP instead.
    Fetched(RefreshOutcome),
}

// ============================================================================
// SessionInner
// ============================================================================

/// Components shared by every handle to one session.
struct SessionInner {
    options: SessionOptions,
    transport: Transport,
    supervisor: Arc<Supervisor>,
    synchronizer: Arc<StateSynchronizer>,
    refresher: Arc<RefreshCoordinator>,
    runtime: Handle,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.supervisor.stop();
        self.transport.close();
    }
}

impl SessionInner {
    fn on_transport_event(&self, event: &TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if let Err(e) = self.synchronizer.bootstrap() {
                    warn!(error = %e, "Initial state sync failed");
                }
            }

            TransportEvent::MessageReceived(text) => self.on_frame(text),

            // Reconnects belong to the supervisor
            TransportEvent::Closed { .. } | TransportEvent::Errored(_) => {}
        }
    }

    fn on_frame(&self, text: &str) {
        match InboundFrame::decode(text) {
            Ok(InboundFrame::UiUpdate { state }) => {
                debug!(keys = state.len(), "Received UI update");
                self.synchronizer.on_server_state(state);
                self.refresher.spawn_refresh();
            }
            Ok(InboundFrame::Unknown { kind }) => {
                trace!(?kind, "Ignoring frame");
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
            }
        }
    }

    /// Queues the sync before returning, so the server sees navigations
    /// in the order the navigator reported them.
    fn on_navigation(&self, location: &str) {
        if let Err(e) = self.synchronizer.on_navigation_changed(location) {
            error!(error = %e, location = %location, "Cannot sync navigation");
        }
    }
}

// ============================================================================
// SyncSession
// ============================================================================

/// Client-side sync agent.
///
/// Cheap to clone; all clones drive the same session. Dropping the last
/// clone cancels any scheduled reconnect and closes the socket.
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSession")
            .field("status", &self.status())
            .field("supervisor", &self.supervisor_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SyncSession - Construction
// ============================================================================

impl SyncSession {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Wires components and listeners together.
    pub(crate) fn assemble(
        options: SessionOptions,
        navigator: Arc<dyn Navigator>,
        renderer: Option<Arc<dyn Renderer>>,
        overlay: Arc<dyn Overlay>,
        source: Arc<dyn UiSource>,
        runtime: Handle,
    ) -> Self {
        let transport = Transport::new();
        let supervisor = Supervisor::attach(&transport, options.reconnect);
        let synchronizer = Arc::new(StateSynchronizer::new(
            transport.clone(),
            Arc::clone(&navigator),
        ));
        let refresher = Arc::new(RefreshCoordinator::new(
            source,
            overlay,
            Arc::clone(&navigator),
        ));
        if let Some(renderer) = renderer {
            refresher.set_renderer(renderer);
        }

        let inner = Arc::new(SessionInner {
            options,
            transport,
            supervisor,
            synchronizer,
            refresher,
            runtime,
        });

        let weak: Weak<SessionInner> = Arc::downgrade(&inner);
        inner
            .transport
            .subscribe(Arc::new(move |event: &TransportEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_transport_event(event);
                }
            }));

        let weak: Weak<SessionInner> = Arc::downgrade(&inner);
        navigator.subscribe(Box::new(move |location: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.on_navigation(location);
            }
        }));

        Self { inner }
    }
}

// ============================================================================
// SyncSession - Public API
// ============================================================================

impl SyncSession {
    /// Connects, or reconnects, to the server.
    ///
    /// Without `url`, the address comes from the session options. Any
    /// scheduled reconnect is cancelled and the previous socket closed.
    /// Failures are reported to the supervisor, which retries them.
    pub async fn connect(&self, url: Option<&str>) {
        let url = url
            .map(str::to_owned)
            .unwrap_or_else(|| self.inner.options.ws_url());

        debug!(url = %url, "Session connect requested");
        self.inner.supervisor.connect(&url).await;
    }

    /// Sends a partial state to the server.
    ///
    /// Local state only changes when the server echoes it back.
    pub async fn sync_state(&self, partial: SharedState) -> SyncOutcome {
        match self.inner.synchronizer.sync_state(partial).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Cannot sync state");
                SyncOutcome::Failed
            }
        }
    }

    /// Fetches and renders the UI over HTTP now.
    ///
    /// The cycle runs on its own task, so a panicking renderer is reported
    /// as [`RefreshOutcome::Failed`] instead of unwinding into the caller.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        let refresher = Arc::clone(&self.inner.refresher);
        let cycle = self.inner.runtime.spawn(async move { refresher.refresh().await });

        match cycle.await {
            Ok(Ok(outcome)) => outcome,
            // Logged by the coordinator
            Ok(Err(_)) => RefreshOutcome::Failed,
            Err(e) => {
                error!(error = %e, "Refresh task panicked");
                RefreshOutcome::Failed
            }
        }
    }

    /// Asks the server to push a refresh, or fetches directly when offline.
    ///
    /// A send that fails on an open socket also falls back to fetching.
    pub async fn request_server_refresh(&self) -> ServerRefresh {
        if self.status().is_open() {
            match self.inner.transport.send(&OutboundMessage::Refresh).await {
                Ok(()) => {
                    debug!("Requested server refresh");
                    return ServerRefresh::Requested;
                }
                Err(e) => {
                    warn!(error = %e, "Refresh request failed, fetching instead");
                }
            }
        }

        ServerRefresh::Fetched(self.force_refresh().await)
    }

    /// Closes the socket and stops reconnecting.
    pub fn close(&self) {
        info!("Closing session");
        self.inner.supervisor.stop();
        self.inner.transport.close();
    }

    /// Installs (or replaces) the renderer.
    pub fn set_renderer(&self, renderer: Arc<dyn Renderer>) {
        self.inner.refresher.set_renderer(renderer);
    }
}

// ============================================================================
// SyncSession - Accessors
// ============================================================================

impl SyncSession {
    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionState {
        self.inner.transport.status()
    }

    /// Returns a copy of the last server-confirmed state.
    #[must_use]
    pub fn state(&self) -> SharedState {
        self.inner.synchronizer.snapshot()
    }

    /// Returns the server's `current_page`, if set.
    #[must_use]
    pub fn current_page(&self) -> Option<String> {
        self.inner.synchronizer.current_page()
    }

    /// Returns the reconnection supervisor's state.
    #[inline]
    #[must_use]
    pub fn supervisor_state(&self) -> SupervisorState {
        self.inner.supervisor.state()
    }

    /// Returns reconnect attempts in the current failure streak.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.supervisor.attempts()
    }

    /// Returns `true` while a refresh cycle runs.
    #[inline]
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresher.is_refreshing()
    }

    /// Returns the session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;

    use futures_util::SinkExt;

    use crate::protocol::page_state;
    use crate::supervisor::ReconnectPolicy;
    use crate::sync::MemoryNavigator;
    use crate::testing::{
        CountingOverlay, Peer, RecordingRenderer, StubSource, assert_silent, eventually,
        init_tracing, next_frame, push, server,
    };

    struct Fixture {
        session: SyncSession,
        navigator: Arc<MemoryNavigator>,
        renderer: Arc<RecordingRenderer>,
        overlay: Arc<CountingOverlay>,
        source: Arc<StubSource>,
    }

    fn fixture(location: &str, source: StubSource) -> Fixture {
        fixture_with(location, source, SessionOptions::new())
    }

    fn fixture_with(location: &str, source: StubSource, options: SessionOptions) -> Fixture {
        init_tracing();

        let navigator = Arc::new(MemoryNavigator::with_location(location));
        let renderer = Arc::new(RecordingRenderer::default());
        let overlay = Arc::new(CountingOverlay::default());
        let source = Arc::new(source);

        let session = SyncSession::builder()
            .navigator(navigator.clone())
            .renderer(renderer.clone())
            .overlay(overlay.clone())
            .ui_source(source.clone())
            .options(options)
            .build()
            .unwrap();

        Fixture {
            session,
            navigator,
            renderer,
            overlay,
            source,
        }
    }

    async fn connect(f: &Fixture) -> Peer {
        let (url, mut accepted) = server().await;
        f.session.connect(Some(url.as_str())).await;
        let peer = accepted.recv().await.unwrap();
        eventually(|| f.session.status().is_open()).await;
        peer
    }

    #[tokio::test]
    async fn test_open_bootstraps_location() -> anyhow::Result<()> {
        let f = fixture("reports", StubSource::default());
        let mut peer = connect(&f).await;

        assert_eq!(
            next_frame(&mut peer).await,
            json!({"action": "sync_state", "state": {"current_page": "reports"}})
        );
        assert_silent(&mut peer).await;
        assert_eq!(f.session.supervisor_state(), SupervisorState::Open);
        Ok(())
    }

    #[tokio::test]
    async fn test_navigation_sends_exactly_one_sync() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;
        assert_silent(&mut peer).await;

        f.navigator.navigate("dashboard");

        assert_eq!(
            next_frame(&mut peer).await,
            json!({"action": "sync_state", "state": {"current_page": "dashboard"}})
        );
        assert_silent(&mut peer).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_navigations_reach_server_in_order() {
        const ROUNDS: usize = 300;

        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        for i in 0..ROUNDS {
            f.navigator.navigate(&format!("a{i}"));
            f.navigator.navigate(&format!("b{i}"));
        }

        for i in 0..ROUNDS {
            for page in [format!("a{i}"), format!("b{i}")] {
                assert_eq!(
                    next_frame(&mut peer).await,
                    json!({"action": "sync_state", "state": {"current_page": page}})
                );
            }
        }
        assert_silent(&mut peer).await;
    }

    #[tokio::test]
    async fn test_ui_update_follows_page_without_echo() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;
        f.navigator.replace_location("home");

        push(
            &mut peer,
            json!({"type": "ui_update", "state": {"current_page": "dashboard", "count": 3}}),
        )
        .await;

        eventually(|| f.renderer.count() == 1).await;
        assert_eq!(f.navigator.location(), "dashboard");
        assert_eq!(f.navigator.history_len(), 1);
        assert_eq!(
            f.session.state(),
            json!({"current_page": "dashboard", "count": 3})
                .as_object()
                .cloned()
                .unwrap()
        );
        assert!(!f.overlay.visible());
        assert_eq!(f.source.last_location.lock().as_deref(), Some("dashboard"));

        // Loop prevention: the replacing write sends nothing back
        assert_silent(&mut peer).await;
    }

    #[tokio::test]
    async fn test_ui_update_without_state_clears_state() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        push(&mut peer, json!({"type": "ui_update", "state": {"current_page": "a"}})).await;
        eventually(|| f.session.current_page().is_some()).await;

        push(&mut peer, json!({"type": "ui_update"})).await;
        eventually(|| f.session.state().is_empty()).await;
    }

    #[tokio::test]
    async fn test_ui_update_with_non_object_state_refreshes() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        push(&mut peer, json!({"type": "ui_update", "state": {"current_page": "a"}})).await;
        eventually(|| f.renderer.count() == 1).await;

        push(&mut peer, json!({"type": "ui_update", "state": "home"})).await;
        eventually(|| f.renderer.count() == 2).await;
        assert!(f.session.state().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_frames_are_ignored() -> anyhow::Result<()> {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        push(&mut peer, json!({"type": "heartbeat"})).await;
        peer.send(Message::Text("{not json".to_string().into()))
            .await?;
        push(&mut peer, json!({"type": "ui_update", "state": {"current_page": "x"}})).await;

        eventually(|| f.session.current_page().as_deref() == Some("x")).await;
        eventually(|| f.renderer.count() == 1).await;
        assert!(f.session.status().is_open());
        Ok(())
    }

    #[tokio::test]
    async fn test_sync_state_while_disconnected() {
        let f = fixture("", StubSource::default());

        let outcome = f.session.sync_state(page_state("dashboard")).await;

        assert_eq!(outcome, SyncOutcome::Failed);
        assert!(f.session.state().is_empty());
    }

    #[tokio::test]
    async fn test_sync_state_when_connected() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        let mut partial = SharedState::new();
        partial.insert("theme".into(), json!("dark"));
        assert_eq!(f.session.sync_state(partial).await, SyncOutcome::Sent);

        assert_eq!(
            next_frame(&mut peer).await,
            json!({"action": "sync_state", "state": {"theme": "dark"}})
        );
        assert!(f.session.state().is_empty());
    }

    #[tokio::test]
    async fn test_request_server_refresh_when_open() {
        let f = fixture("", StubSource::default());
        let mut peer = connect(&f).await;

        assert_eq!(
            f.session.request_server_refresh().await,
            ServerRefresh::Requested
        );
        assert_eq!(next_frame(&mut peer).await, json!({"action": "refresh"}));
        assert_eq!(f.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_server_refresh_when_offline_fetches() {
        let f = fixture("home", StubSource::default());

        assert_eq!(
            f.session.request_server_refresh().await,
            ServerRefresh::Fetched(RefreshOutcome::Rendered)
        );
        assert_eq!(f.source.calls(), 1);
        assert_eq!(f.renderer.count(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_server_error() {
        let f = fixture("", StubSource::failing(500));

        assert_eq!(f.session.force_refresh().await, RefreshOutcome::Failed);
        assert_eq!(f.renderer.count(), 0);
        assert!(!f.overlay.visible());
        assert!(!f.session.is_refreshing());
    }

    #[tokio::test]
    async fn test_force_refresh_contains_renderer_panic() {
        let f = fixture("", StubSource::default());
        f.session.set_renderer(Arc::new(RecordingRenderer {
            panic: true,
            ..RecordingRenderer::default()
        }));

        assert_eq!(f.session.force_refresh().await, RefreshOutcome::Failed);
        assert!(!f.overlay.visible());
        assert!(!f.session.is_refreshing());

        // The coordinator is usable again
        f.session.set_renderer(f.renderer.clone());
        assert_eq!(f.session.force_refresh().await, RefreshOutcome::Rendered);
        assert_eq!(
            f.session.request_server_refresh().await,
            ServerRefresh::Fetched(RefreshOutcome::Rendered)
        );
    }

    #[tokio::test]
    async fn test_server_drop_reconnects_and_bootstraps() {
        let options = SessionOptions::new()
            .with_reconnect_policy(ReconnectPolicy::new(5, Duration::from_millis(10)));
        let f = fixture_with("home", StubSource::default(), options);
        let bootstrap = json!({"action": "sync_state", "state": {"current_page": "home"}});

        let (url, mut accepted) = server().await;
        f.session.connect(Some(url.as_str())).await;
        let mut first = accepted.recv().await.unwrap();
        assert_eq!(next_frame(&mut first).await, bootstrap);

        first.close(None).await.unwrap();

        let mut second = accepted.recv().await.unwrap();
        assert_eq!(next_frame(&mut second).await, bootstrap);
        eventually(|| f.session.supervisor_state() == SupervisorState::Open).await;
        assert_eq!(f.session.reconnect_attempts(), 0);
        assert!(f.session.status().is_open());
    }

    #[tokio::test]
    async fn test_close_is_not_retried() {
        let f = fixture("", StubSource::default());
        let _peer = connect(&f).await;

        f.session.close();

        eventually(|| f.session.status() == ConnectionState::Disconnected).await;
        assert_eq!(f.session.supervisor_state(), SupervisorState::Idle);
        assert_eq!(f.session.reconnect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_connect_without_url_uses_options() {
        let navigator = Arc::new(MemoryNavigator::new());
        let session = SyncSession::builder()
            .navigator(navigator)
            .ui_source(Arc::new(StubSource::default()))
            .options(SessionOptions::new().with_query("ws_port=1"))
            .build()
            .unwrap();

        assert_eq!(session.options().ws_url(), "ws://localhost:1");
        session.close();
        assert_eq!(session.status(), ConnectionState::Disconnected);
    }
}
