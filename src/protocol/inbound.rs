//! Inbound frame types.
//!
//! Frames pushed by the UI server. Only `ui_update` carries meaning today;
//! every other `type` decodes to [`InboundFrame::Unknown`] so newer servers
//! can add frame kinds without breaking older clients.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Value, from_str};
use tracing::debug;

use crate::error::{Error, Result};

use super::SharedState;

// ============================================================================
// Constants
// ============================================================================

/// Frame type carrying a state snapshot and a refresh trigger.
const UI_UPDATE: &str = "ui_update";

// ============================================================================
// Envelope
// ============================================================================

/// Raw wire envelope.
///
/// # Format
///
/// ```json
/// { "type": "ui_update", "state": { ... } }
/// ```
#[derive(Debug, Deserialize)]
struct Envelope {
    /// Frame type marker.
    #[serde(rename = "type", default)]
    kind: Option<String>,

    /// Optional state snapshot.
    #[serde(default)]
    state: Option<Value>,
}

// ============================================================================
// InboundFrame
// ============================================================================

/// A decoded frame from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Server state changed; carries the full snapshot.
    UiUpdate {
        /// Complete server-confirmed state. Empty when the frame had none.
        state: SharedState,
    },

    /// Any other frame type.
    Unknown {
        /// The `type` field, if present.
        kind: Option<String>,
    },
}

impl InboundFrame {
    /// Decodes a text frame.
    ///
    /// A `ui_update` whose `state` is missing or not an object still counts
    /// as an update, with an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not a JSON object.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope =
            from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))?;

        if envelope.kind.as_deref() != Some(UI_UPDATE) {
            return Ok(Self::Unknown {
                kind: envelope.kind,
            });
        }

        let state = match envelope.state {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => SharedState::new(),
            Some(other) => {
                debug!(state = %other, "ui_update state is not an object, using empty state");
                SharedState::new()
            }
        };

        Ok(Self::UiUpdate { state })
    }

    /// Returns `true` if this frame is a UI update.
    #[inline]
    #[must_use]
    pub fn is_ui_update(&self) -> bool {
        matches!(self, Self::UiUpdate { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
