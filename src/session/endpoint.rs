//! WebSocket endpoint resolution.
//!
//! Priority, first match wins:
//!
//! 1. explicit URL
//! 2. `ws_port` query parameter
//! 3. page-level `ws-port` value
//! 4. default port
//!
//! Empty values are skipped. Ports other than the explicit URL are bound to
//! `ws://{host}`.

// ============================================================================
// Imports
// ============================================================================

use url::form_urlencoded;

use super::options::SessionOptions;

// ============================================================================
// Constants
// ============================================================================

/// Query parameter carrying the WebSocket port.
pub const WS_PORT_PARAM: &str = "ws_port";

// ============================================================================
// Resolution
// ============================================================================

/// Resolves the WebSocket URL for `options`.
#[must_use]
pub fn resolve_ws_url(options: &SessionOptions) -> String {
    if let Some(url) = options.url.as_deref().filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    let port = options
        .query
        .as_deref()
        .and_then(query_port)
        .or_else(|| {
            options
                .page_ws_port
                .clone()
                .filter(|p| !p.is_empty())
        })
        .unwrap_or_else(|| options.default_port.to_string());

    format!("ws://{}:{port}", options.host)
}

/// Extracts a non-empty `ws_port` from a query string.
fn query_port(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == WS_PORT_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

// ============================================================================
// Tests
// ============================================================================
