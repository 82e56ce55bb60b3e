//! Outbound message types.
//!
//! Messages sent from the client to the UI server.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::to_string;

use crate::error::Result;

use super::SharedState;

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message from the client to the server.
///
/// # Format
///
/// ```json
/// { "action": "sync_state", "state": { "current_page": "dashboard" } }
/// { "action": "refresh" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum OutboundMessage {
    /// Push a partial state change to the server.
    #[serde(rename = "sync_state")]
    Sync {
        /// Keys to update on the server.
        state: SharedState,
    },

    /// Ask the server to broadcast a fresh UI update.
    #[serde(rename = "refresh")]
    Refresh,
}

impl OutboundMessage {
    /// Creates a sync message.
    #[inline]
    #[must_use]
    pub fn sync(state: SharedState) -> Self {
        Self::Sync { state }
    }

    /// Returns the wire action name.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "sync_state",
            Self::Refresh => "refresh",
        }
    }

    /// Serializes the message into its wire envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if a state value cannot
    /// be serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
