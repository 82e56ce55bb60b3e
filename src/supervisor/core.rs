//! Reconnection supervisor.
//!
//! Watches transport lifecycle events and schedules reconnects with
//! exponential backoff.
//!
//! # State Machine
//!
//! ```text
//! Idle ──connect()──► Connecting ──Opened──► Open (attempts = 0)
//!                        ▲                    │
//!                        │ delay elapsed      │ unexpected Closed
//!                        └──── Scheduled ◄────┤ attempts < max
//!                                             │
//!                                             └──► Exhausted (attempts == max)
//! ```
//!
//! Exhausted is terminal until something calls [`Supervisor::connect`]
//! again. The supervisor only keeps a [`WeakTransport`]; the transport
//! itself is owned by the session.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::transport::{Transport, TransportEvent, WeakTransport};

use super::budget::{ReconnectBudget, ReconnectPolicy};

// ============================================================================
// SupervisorState
// ============================================================================

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    /// Nothing requested yet, or the last close was requested.
    #[default]
    Idle,
    /// A connect is running or scheduled.
    Connecting,
    /// Transport is open.
    Open,
    /// Budget spent; waiting for an explicit connect.
    Exhausted,
}

// ============================================================================
// Types
// ============================================================================

/// A reconnect waiting on its timer.
struct PendingReconnect {
    delay: Duration,
    handle: JoinHandle<()>,
}

/// Mutable supervisor state.
struct SupervisorInner {
    state: SupervisorState,
    budget: ReconnectBudget,
    url: Option<String>,
    pending: Option<PendingReconnect>,
}

// ============================================================================
// Supervisor
// ============================================================================

/// Reconnects a transport after unexpected closes.
pub struct Supervisor {
    /// Transport to reconnect.
    transport: WeakTransport,
    /// Guarded mutable state.
    inner: Mutex<SupervisorInner>,
}

impl Supervisor {
    /// Creates a supervisor for `transport` and registers it as a listener.
    #[must_use]
    pub fn attach(transport: &Transport, policy: ReconnectPolicy) -> Arc<Self> {
        let supervisor = Arc::new(Self {
            transport: transport.downgrade(),
            inner: Mutex::new(SupervisorInner {
                state: SupervisorState::Idle,
                budget: ReconnectBudget::new(policy),
                url: None,
                pending: None,
            }),
        });

        let weak: Weak<Self> = Arc::downgrade(&supervisor);
        transport.subscribe(Arc::new(move |event: &TransportEvent| {
            if let Some(supervisor) = weak.upgrade() {
                supervisor.handle_event(event);
            }
        }));

        supervisor
    }

    /// Connects explicitly, cancelling any scheduled reconnect.
    ///
    /// `url` becomes the target of later automatic reconnects.
    pub async fn connect(&self, url: &str) {
        self.cancel_pending();

        {
            let mut inner = self.inner.lock();
            inner.state = SupervisorState::Connecting;
            inner.url = Some(url.to_string());
        }

        if let Some(transport) = self.transport.upgrade() {
            transport.connect(url).await;
        }
    }

    /// Cancels a scheduled reconnect, if any.
    ///
    /// Returns `true` if one was cancelled.
    pub fn cancel_pending(&self) -> bool {
        let pending = self.inner.lock().pending.take();
        match pending {
            Some(pending) => {
                pending.handle.abort();
                debug!(delay_ms = pending.delay.as_millis() as u64, "Cancelled scheduled reconnect");
                true
            }
            None => false,
        }
    }

    /// Stops supervising until the next [`Supervisor::connect`].
    ///
    /// Cancels any scheduled reconnect and returns to `Idle`.
    pub fn stop(&self) {
        self.cancel_pending();
        self.inner.lock().state = SupervisorState::Idle;
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.inner.lock().state
    }

    /// Returns attempts made in the current failure streak.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.inner.lock().budget.attempts()
    }

    /// Returns the delay of the scheduled reconnect, if one is waiting.
    #[inline]
    #[must_use]
    pub fn pending_delay(&self) -> Option<Duration> {
        self.inner.lock().pending.as_ref().map(|p| p.delay)
    }

    /// Returns the URL used for reconnects.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.inner.lock().url.clone()
    }
}

// ============================================================================
// Supervisor - Event Handling
// ============================================================================

impl Supervisor {
    /// Reacts to one transport event.
    fn handle_event(self: &Arc<Self>, event: &TransportEvent) {
        match event {
            TransportEvent::Opened => {
                let mut inner = self.inner.lock();
                inner.budget.on_opened();
                inner.state = SupervisorState::Open;
            }

            TransportEvent::Closed {
                requested: true, ..
            } => {
                self.cancel_pending();
                self.inner.lock().state = SupervisorState::Idle;
            }

            TransportEvent::Closed {
                requested: false,
                code,
            } => self.on_unexpected_close(*code),

            TransportEvent::Errored(e) => {
                warn!(error = %e, "WebSocket error");
            }

            TransportEvent::MessageReceived(_) => {}
        }
    }

    /// Spends budget and schedules the next attempt.
    fn on_unexpected_close(self: &Arc<Self>, code: Option<u16>) {
        let mut inner = self.inner.lock();

        let Some(delay) = inner.budget.on_closed() else {
            inner.state = SupervisorState::Exhausted;
            let attempts = inner.budget.attempts();
            drop(inner);
            error!(
                error = %Error::reconnect_exhausted(attempts),
                "Max reconnect attempts reached"
            );
            return;
        };

        let attempt = inner.budget.attempts();
        inner.state = SupervisorState::Connecting;

        info!(
            ?code,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Attempting to reconnect"
        );

        let supervisor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            supervisor.fire().await;
        });

        if let Some(previous) = inner.pending.replace(PendingReconnect { delay, handle }) {
            previous.handle.abort();
        }
    }

    /// Runs a scheduled reconnect.
    async fn fire(&self) {
        let url = {
            let mut inner = self.inner.lock();
            // Detach without aborting: this is the running task
            inner.pending = None;
            inner.url.clone()
        };

        let Some(url) = url else {
            debug!("No URL to reconnect to");
            return;
        };

        match self.transport.upgrade() {
            Some(transport) => transport.connect(&url).await,
            None => debug!("Transport dropped, reconnect skipped"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
