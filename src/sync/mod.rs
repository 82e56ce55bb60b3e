//! Shared state and navigation reconciliation.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `navigation` | Location store boundary |
//! | `synchronizer` | Server-confirmed state and loop prevention |

// ============================================================================
// Submodules
// ============================================================================

/// Navigation boundary.
pub mod navigation;

/// State synchronizer.
pub mod synchronizer;

// ============================================================================
// Re-exports
// ============================================================================

pub use navigation::{MemoryNavigator, NavigationListener, Navigator};
pub use synchronizer::{StateSynchronizer, SyncOutcome};
