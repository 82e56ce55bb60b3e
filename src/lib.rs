//! Cacao sync - realtime state synchronization client for Cacao UI servers.
//!
//! This library keeps a client's view of shared UI state in step with a
//! Cacao server over a WebSocket, and re-renders the UI whenever the server
//! pushes an update.
//!
//! # Architecture
//!
//! The client follows a push model:
//!
//! - **Server**: owns the authoritative state, pushes `ui_update` frames
//! - **Client (Rust)**: forwards navigation as `sync_state`, follows the
//!   server's page, and fetches the rendered UI over HTTP on every update
//!
//! Key design principles:
//!
//! - One [`SyncSession`] owns every component; there is no global state
//! - Exactly one live socket at a time; superseded sockets are silenced
//! - Unexpected closes are retried with exponential backoff, capped at 5
//! - Server-driven location writes never echo back to the server
//! - Refreshes are single-flight and always clear their overlay
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cacao_sync::{MemoryNavigator, Result, SyncSession, UiPayload};
//!
//! struct PrintRenderer;
//!
//! impl cacao_sync::Renderer for PrintRenderer {
//!     fn render(&self, payload: &UiPayload) -> Result<()> {
//!         println!("{}", payload.as_value());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let navigator = Arc::new(MemoryNavigator::with_location("home"));
//!
//!     let session = SyncSession::builder()
//!         .navigator(navigator.clone())
//!         .renderer(Arc::new(PrintRenderer))
//!         .build()?;
//!
//!     session.connect(None).await;
//!     navigator.navigate("dashboard");
//!
//!     println!("status: {}", session.status());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Connection generation IDs |
//! | [`protocol`] | Wire frames and shared state |
//! | [`refresh`] | UI fetch, render and overlay |
//! | [`session`] | The [`SyncSession`] facade and options |
//! | [`supervisor`] | Reconnect backoff |
//! | [`sync`] | Shared state and navigation |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol message types.
///
/// Encodes outbound actions and decodes inbound frames; no I/O.
pub mod protocol;

/// UI refresh: source, renderer, overlay and coordinator.
pub mod refresh;

/// Session facade.
///
/// Use [`SyncSession::builder()`] to create a configured session.
pub mod session;

/// Reconnection supervision.
pub mod supervisor;

/// Shared state synchronization.
pub mod sync;

/// WebSocket transport layer.
///
/// Owns the single connection and broadcasts its lifecycle events.
pub mod transport;

mod guard;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ConnectionId;

// Protocol types
pub use protocol::{InboundFrame, OutboundMessage, SharedState};

// Refresh types
pub use refresh::{
    HttpUiSource, Overlay, OverlayFlag, RefreshCoordinator, RefreshOutcome, Renderer, UiPayload,
    UiSource,
};

// Session types
pub use session::{ServerRefresh, SessionBuilder, SessionOptions, SyncSession};

// Supervisor types
pub use supervisor::{ReconnectPolicy, Supervisor, SupervisorState};

// Sync types
pub use sync::{MemoryNavigator, Navigator, StateSynchronizer, SyncOutcome};

// Transport types
pub use transport::{ConnectionState, Transport, TransportEvent};
