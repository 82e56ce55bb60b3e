//! UI refresh: fetch a fresh UI payload and hand it to the renderer.
//!
//! - [`UiSource`] / [`HttpUiSource`] - cache-busting UI endpoint client
//! - [`Renderer`] / [`Overlay`] - host-provided output surfaces
//! - [`RefreshCoordinator`] - single-flight fetch-and-render cycle

// ============================================================================
// Submodules
// ============================================================================

/// Single-flight refresh cycle.
pub mod coordinator;

/// Renderer and overlay traits.
pub mod render;

/// UI endpoint client.
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use coordinator::{RefreshCoordinator, RefreshOutcome};
pub use render::{Overlay, OverlayFlag, Renderer, UiPayload};
pub use source::{DEFAULT_UI_PATH, HttpUiSource, UiSource};
