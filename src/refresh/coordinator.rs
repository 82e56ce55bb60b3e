//! Refresh coordinator.
//!
//! Runs at most one fetch-and-render cycle at a time. A cycle shows the
//! overlay when it starts and hides it when it ends, whichever way it ends:
//! success, server error, missing renderer, render failure or panic.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::guard::FlightGuard;
use crate::sync::Navigator;

use super::render::{Overlay, Renderer};
use super::source::UiSource;

// ============================================================================
// RefreshOutcome
// ============================================================================

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh UI fetched and rendered.
    Rendered,
    /// A cycle was already running; this request was dropped.
    Skipped,
    /// The cycle failed; the error was logged.
    Failed,
}

// ============================================================================
// RefreshCycle
// ============================================================================

/// Scope of one refresh cycle.
///
/// Dropping it hides the overlay, then releases the single-flight flag.
struct RefreshCycle<'a> {
    _flight: FlightGuard<'a>,
    overlay: &'a dyn Overlay,
}

impl<'a> RefreshCycle<'a> {
    fn begin(flag: &'a AtomicBool, overlay: &'a dyn Overlay) -> Option<Self> {
        let flight = FlightGuard::try_acquire(flag)?;
        overlay.show();
        Some(Self {
            _flight: flight,
            overlay,
        })
    }
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        self.overlay.hide();
    }
}

// ============================================================================
// RefreshCoordinator
// ============================================================================

/// Single-flight fetch-and-render driver.
pub struct RefreshCoordinator {
    /// UI endpoint.
    source: Arc<dyn UiSource>,
    /// Installed renderer, if any.
    renderer: RwLock<Option<Arc<dyn Renderer>>>,
    /// Refresh-in-progress affordance.
    overlay: Arc<dyn Overlay>,
    /// Source of the `_hash` page hint.
    navigator: Arc<dyn Navigator>,
    /// Held for the whole cycle.
    in_flight: AtomicBool,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("has_renderer", &self.renderer.read().is_some())
            .field("in_flight", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates a coordinator with no renderer installed.
    #[must_use]
    pub fn new(
        source: Arc<dyn UiSource>,
        overlay: Arc<dyn Overlay>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            source,
            renderer: RwLock::new(None),
            overlay,
            navigator,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Installs (or replaces) the renderer.
    pub fn set_renderer(&self, renderer: Arc<dyn Renderer>) {
        *self.renderer.write() = Some(renderer);
    }

    /// Removes the renderer; later cycles fail with
    /// [`Error::RendererUnavailable`].
    pub fn clear_renderer(&self) {
        *self.renderer.write() = None;
    }

    /// Returns `true` while a cycle is running.
    #[inline]
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetches and renders the UI, unless a cycle is already running.
    ///
    /// Failures are logged before being returned.
    ///
    /// # Errors
    ///
    /// - [`Error::ServerError`] on a non-success response
    /// - [`Error::RendererUnavailable`] if no renderer is installed
    /// - Any error from the source or renderer
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(_cycle) = RefreshCycle::begin(&self.in_flight, self.overlay.as_ref()) else {
            debug!("Refresh already in progress, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        match self.fetch_and_render().await {
            Ok(()) => {
                debug!("UI refreshed");
                Ok(RefreshOutcome::Rendered)
            }
            Err(e) => {
                error!(error = %e, "Error fetching UI update");
                Err(e)
            }
        }
    }

    /// Runs [`RefreshCoordinator::refresh`] in the background.
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            // Already logged
            let _ = coordinator.refresh().await;
        })
    }

    async fn fetch_and_render(&self) -> Result<()> {
        let location = self.navigator.location();
        let payload = self.source.fetch_ui(Some(&location)).await?;

        let renderer = self
            .renderer
            .read()
            .clone()
            .ok_or(Error::RendererUnavailable)?;

        renderer.render(&payload)
    }
}

// ============================================================================
// Tests
// ============================================================================
