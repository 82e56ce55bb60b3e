//! WebSocket transport layer.
//!
//! This module owns the duplex connection to the UI server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Transport           │                         │  UI server      │
//! │   slot: Connection ──┼───── WebSocket ────────►│                 │
//! │   listeners ─────┐   │      host:1633          │                 │
//! └──────────────────┼───┘                         └─────────────────┘
//!                    ▼
//!        Supervisor, frame dispatcher
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::connect` - close any existing socket, handshake
//! 2. `TransportEvent::Opened` - listeners notified, reading starts
//! 3. `TransportEvent::MessageReceived` - one per text frame, in order
//! 4. `TransportEvent::Closed` - socket gone (`requested` tells who asked)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Per-socket event loop |
//! | `core` | The [`Transport`] owner |
//! | `event` | Lifecycle events and states |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Transport owning the single connection.
pub mod core;

/// Lifecycle events and connection state.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Transport, WeakTransport};
pub use connection::Connection;
pub use event::{ConnectionState, EventListener, TransportEvent};
