//! WebSocket protocol message types.
//!
//! Pure translation between typed messages and JSON text frames. No I/O
//! happens here.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Wire format |
//! |---------|-----------|-------------|
//! | [`OutboundMessage::Sync`] | Client → Server | `{"action":"sync_state","state":{...}}` |
//! | [`OutboundMessage::Refresh`] | Client → Server | `{"action":"refresh"}` |
//! | [`InboundFrame::UiUpdate`] | Server → Client | `{"type":"ui_update","state":{...}}` |
//! | [`InboundFrame::Unknown`] | Server → Client | any other `type` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Frame decoding |
//! | `outbound` | Message encoding |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound frame decoding.
pub mod inbound;

/// Outbound message encoding.
pub mod outbound;

// ============================================================================
// Types
// ============================================================================

/// Shared application state: string keys to arbitrary JSON values.
pub type SharedState = serde_json::Map<String, serde_json::Value>;

/// State key holding the page the server considers current.
pub const CURRENT_PAGE: &str = "current_page";

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::InboundFrame;
pub use outbound::OutboundMessage;

// ============================================================================
// Helpers
// ============================================================================

/// Reads `current_page` from a state map.
///
/// Returns `None` if missing or not a string.
#[inline]
#[must_use]
pub fn current_page(state: &SharedState) -> Option<&str> {
    state.get(CURRENT_PAGE).and_then(|v| v.as_str())
}

/// Builds a single-key state map for `current_page`.
#[must_use]
pub fn page_state(page: impl Into<String>) -> SharedState {
    let mut state = SharedState::new();
    state.insert(
        CURRENT_PAGE.to_string(),
        serde_json::Value::String(page.into()),
    );
    state
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_current_page() {
        let state = page_state("home");
        assert_eq!(current_page(&state), Some("home"));
    }

    #[test]
    fn test_current_page_non_string() {
        let mut state = SharedState::new();
        state.insert(CURRENT_PAGE.into(), json!(3));
        assert_eq!(current_page(&state), None);
        assert_eq!(current_page(&SharedState::new()), None);
    }
}
