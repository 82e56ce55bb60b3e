//! Session facade and configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SessionBuilder`] wiring collaborators |
//! | `core` | The [`SyncSession`] facade |
//! | `endpoint` | WebSocket URL resolution |
//! | `options` | [`SessionOptions`] |

// ============================================================================
// Submodules
// ============================================================================

/// Session builder.
pub mod builder;

/// Sync session facade.
pub mod core;

/// WebSocket endpoint resolution.
pub mod endpoint;

/// Session configuration.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{ServerRefresh, SyncSession};
pub use builder::SessionBuilder;
pub use endpoint::{WS_PORT_PARAM, resolve_ws_url};
pub use options::{DEFAULT_HOST, DEFAULT_HTTP_PORT, DEFAULT_WS_PORT, SessionOptions};
