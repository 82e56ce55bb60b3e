//! State synchronizer.
//!
//! Keeps the last state the server confirmed and reconciles it with the
//! navigation location in both directions:
//!
//! - **Local → server**: a navigation to a page other than `current_page`
//!   sends a `sync_state`. The local copy is not touched until the server
//!   echoes the change back.
//! - **Server → local**: a snapshot replaces the local copy wholesale and,
//!   if `current_page` moved, rewrites the location with a replacing write
//!   that fires no navigation event.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::guard::FlightGuard;
use crate::protocol::{OutboundMessage, SharedState, current_page, page_state};
use crate::transport::Transport;

use super::navigation::Navigator;

// ============================================================================
// SyncOutcome
// ============================================================================

/// What happened to a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Message written to the socket.
    Sent,
    /// Location already matches the server; nothing to send.
    Unchanged,
    /// Another sync was still being sent; this one was dropped.
    Skipped,
    /// Not sent because of an error, already logged by the session.
    Failed,
}

// ============================================================================
// StateSynchronizer
// ============================================================================

/// Owner of the shared state copy.
pub struct StateSynchronizer {
    /// Outbound channel.
    transport: Transport,
    /// Location store.
    navigator: Arc<dyn Navigator>,
    /// Last server-confirmed state.
    state: RwLock<SharedState>,
    /// Held while a sync message is being written.
    sync_in_flight: AtomicBool,
}

impl fmt::Debug for StateSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSynchronizer")
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl StateSynchronizer {
    /// Creates a synchronizer with empty state.
    #[must_use]
    pub fn new(transport: Transport, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            transport,
            navigator,
            state: RwLock::new(SharedState::new()),
            sync_in_flight: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current shared state.
    #[must_use]
    pub fn snapshot(&self) -> SharedState {
        self.state.read().clone()
    }

    /// Returns the server's `current_page`, if set.
    #[must_use]
    pub fn current_page(&self) -> Option<String> {
        current_page(&self.state.read()).map(str::to_owned)
    }

    /// Sends a partial state to the server.
    ///
    /// The local copy is left alone; it changes only when the server pushes
    /// a snapshot back.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the transport is not open
    /// - Any error from [`Transport::send`]
    pub async fn sync_state(&self, partial: SharedState) -> Result<SyncOutcome> {
        if !self.transport.status().is_open() {
            return Err(Error::NotConnected);
        }

        let Some(_guard) = FlightGuard::try_acquire(&self.sync_in_flight) else {
            debug!("State update already in progress, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        debug!(keys = ?partial.keys().collect::<Vec<_>>(), "Sending state sync");

        self.transport
            .send(&OutboundMessage::sync(partial))
            .await?;

        Ok(SyncOutcome::Sent)
    }

    /// Reacts to a user navigation.
    ///
    /// Runs to completion on the caller's thread: the message is queued on
    /// the socket before this returns, so navigations reach the server in
    /// the order they happened.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the transport is not open
    /// - Any error from [`Transport::enqueue`]
    pub fn on_navigation_changed(&self, location: &str) -> Result<SyncOutcome> {
        if location.is_empty() || self.current_page().as_deref() == Some(location) {
            return Ok(SyncOutcome::Unchanged);
        }

        if !self.transport.status().is_open() {
            return Err(Error::NotConnected);
        }

        let Some(_guard) = FlightGuard::try_acquire(&self.sync_in_flight) else {
            debug!(location = %location, "State update already in progress, skipping");
            return Ok(SyncOutcome::Skipped);
        };

        debug!(location = %location, "Queueing navigation sync");

        self.transport.enqueue(&OutboundMessage::sync(page_state(location)))?;

        Ok(SyncOutcome::Sent)
    }

    /// Pushes the current location once the connection opens.
    ///
    /// # Errors
    ///
    /// Same as [`StateSynchronizer::on_navigation_changed`].
    pub fn bootstrap(&self) -> Result<SyncOutcome> {
        let location = self.navigator.location();
        self.on_navigation_changed(&location)
    }

    /// Applies a server snapshot.
    ///
    /// Replaces the local copy wholesale, then moves the location to the
    /// server's `current_page` with a replacing write.
    pub fn on_server_state(&self, state: SharedState) {
        let page = current_page(&state).map(str::to_owned);
        *self.state.write() = state;

        let Some(page) = page.filter(|p| !p.is_empty()) else {
            return;
        };

        if self.navigator.location() != page {
            info!(page = %page, "Following server page change");
            self.navigator.replace_location(&page);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
