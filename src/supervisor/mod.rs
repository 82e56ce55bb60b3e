//! Reconnection supervision.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `budget` | Backoff policy and attempt counting |
//! | `core` | The [`Supervisor`] listener and scheduler |

// ============================================================================
// Submodules
// ============================================================================

/// Backoff policy and attempt budget.
pub mod budget;

/// Reconnect scheduling.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Supervisor, SupervisorState};
pub use budget::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ReconnectBudget, ReconnectPolicy};
