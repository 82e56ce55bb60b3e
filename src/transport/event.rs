//! Transport lifecycle events and connection state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Error;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the single transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none being established.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Frames can be sent and received.
    Open,
    /// Requested close in progress.
    Closing,
}

impl ConnectionState {
    /// Returns `true` if frames can be sent.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle event emitted by the transport to its listeners.
#[derive(Debug)]
pub enum TransportEvent {
    /// Connection established.
    Opened,

    /// Text frame received on the current connection.
    MessageReceived(String),

    /// Connection ended.
    Closed {
        /// Close code sent by the peer, if any.
        code: Option<u16>,
        /// `true` when the close was asked for through `Transport::close`.
        requested: bool,
    },

    /// Connection-level failure.
    ///
    /// A failed connect emits `Errored` followed by `Closed`.
    Errored(Error),
}

impl TransportEvent {
    /// Returns `true` for a close nobody asked for.
    #[inline]
    #[must_use]
    pub fn is_unexpected_close(&self) -> bool {
        matches!(
            self,
            Self::Closed {
                requested: false,
                ..
            }
        )
    }
}

/// Listener callback registered on a transport.
///
/// Listeners run inline on the task that produced the event. They must not
/// block and must not register further listeners.
pub type EventListener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::Connecting.is_open());
        assert!(ConnectionState::Open.is_open());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Closing.to_string(), "closing");
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }

    #[test]
    fn test_unexpected_close() {
        let lost = TransportEvent::Closed {
            code: Some(1006),
            requested: false,
        };
        let asked = TransportEvent::Closed {
            code: Some(1000),
            requested: true,
        };
        assert!(lost.is_unexpected_close());
        assert!(!asked.is_unexpected_close());
        assert!(!TransportEvent::Opened.is_unexpected_close());
    }
}
