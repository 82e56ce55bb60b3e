//! Builder pattern for session wiring.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cacao_sync::{MemoryNavigator, SessionOptions, SyncSession};
//!
//! # async fn example() -> cacao_sync::Result<()> {
//! let navigator = Arc::new(MemoryNavigator::with_location("home"));
//!
//! let session = SyncSession::builder()
//!     .navigator(navigator)
//!     .options(SessionOptions::new().with_query("?ws_port=9000"))
//!     .build()?;
//!
//! session.connect(None).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::refresh::{HttpUiSource, Overlay, OverlayFlag, Renderer, UiSource};
use crate::sync::{MemoryNavigator, Navigator};

use super::core::SyncSession;
use super::options::SessionOptions;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for a [`SyncSession`].
///
/// Use [`SyncSession::builder()`] to create one. Anything left unset gets a
/// default: an empty [`MemoryNavigator`], an [`OverlayFlag`], and an
/// [`HttpUiSource`] pointed at the configured UI endpoint. Without a
/// renderer, refreshes fail with [`Error::RendererUnavailable`].
#[derive(Default)]
pub struct SessionBuilder {
    navigator: Option<Arc<dyn Navigator>>,
    renderer: Option<Arc<dyn Renderer>>,
    overlay: Option<Arc<dyn Overlay>>,
    source: Option<Arc<dyn UiSource>>,
    options: SessionOptions,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("has_renderer", &self.renderer.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the location store.
    #[inline]
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the renderer.
    #[inline]
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the refresh overlay.
    #[inline]
    #[must_use]
    pub fn overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Sets the UI source, replacing the HTTP default.
    #[inline]
    #[must_use]
    pub fn ui_source(mut self, source: Arc<dyn UiSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the session and registers its listeners.
    ///
    /// Must be called inside a tokio runtime; refreshes are spawned on it.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if called outside a tokio runtime
    /// - [`Error::InvalidUrl`] if the UI endpoint URL is invalid
    pub fn build(self) -> Result<SyncSession> {
        let runtime = Handle::try_current().map_err(|_| {
            Error::config(
                "SyncSession must be built inside a tokio runtime.\n\
                 Example: call build() from an async fn under #[tokio::main]",
            )
        })?;

        let source = match self.source {
            Some(source) => source,
            None => Arc::new(HttpUiSource::from_base(
                &self.options.ui_base_url(),
                &self.options.ui_path,
            )?),
        };

        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(MemoryNavigator::new()));
        let overlay = self.overlay.unwrap_or_else(|| Arc::new(OverlayFlag::new()));

        Ok(SyncSession::assemble(
            self.options,
            navigator,
            self.renderer,
            overlay,
            source,
            runtime,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_outside_runtime_fails() {
        let err = SessionBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_build_with_defaults() {
        let session = SessionBuilder::new().build().unwrap();
        assert!(!session.status().is_open());
        assert!(session.state().is_empty());
    }

    #[tokio::test]
    async fn test_build_rejects_bad_ui_base() {
        let err = SessionBuilder::new()
            .options(SessionOptions::new().with_ui_base("not a url"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_custom_source_skips_url_validation() {
        let session = SessionBuilder::new()
            .options(SessionOptions::new().with_ui_base("not a url"))
            .ui_source(Arc::new(crate::testing::StubSource::default()))
            .build();
        assert!(session.is_ok());
    }
}
