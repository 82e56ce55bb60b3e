//! Renderer and overlay boundaries.
//!
//! The renderer paints a UI payload; the overlay is the "refreshing"
//! affordance shown while a payload is fetched. Both are owned by the host
//! application and only called from here.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// UiPayload
// ============================================================================

/// Rendered-UI document returned by the UI endpoint.
///
/// Its schema belongs to the renderer; this crate never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiPayload(Value);

impl UiPayload {
    /// Wraps a JSON document.
    #[inline]
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the JSON document.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the JSON document.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Paints a UI payload.
pub trait Renderer: Send + Sync {
    /// Renders `payload`.
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::Render`](crate::Error::Render) when
    /// the payload cannot be painted.
    fn render(&self, payload: &UiPayload) -> Result<()>;
}

// ============================================================================
// Overlay
// ============================================================================

/// Refresh-in-progress affordance.
pub trait Overlay: Send + Sync {
    /// Makes the overlay visible.
    fn show(&self);

    /// Hides the overlay.
    fn hide(&self);
}

/// [`Overlay`] backed by a flag, for hosts that poll visibility.
#[derive(Debug, Default)]
pub struct OverlayFlag {
    visible: AtomicBool,
}

impl OverlayFlag {
    /// Creates a hidden overlay.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while visible.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }
}

impl Overlay for OverlayFlag {
    fn show(&self) {
        self.visible.store(true, Ordering::Release);
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::Release);
    }
}

// ============================================================================
// Tests
// ============================================================================
