//! Session configuration.
//!
//! # Example
//!
//! ```
//! use cacao_sync::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_host("ui.internal")
//!     .with_query("?ws_port=9000");
//!
//! assert_eq!(options.ws_url(), "ws://ui.internal:9000");
//! assert_eq!(options.ui_base_url(), "http://ui.internal:1634");
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::refresh::DEFAULT_UI_PATH;
use crate::supervisor::ReconnectPolicy;

use super::endpoint::resolve_ws_url;

// ============================================================================
// Constants
// ============================================================================

/// Host used when the page host is unknown.
pub const DEFAULT_HOST: &str = "localhost";

/// WebSocket port used when nothing overrides it.
pub const DEFAULT_WS_PORT: u16 = 1633;

/// HTTP port of the UI endpoint when no base URL is given.
pub const DEFAULT_HTTP_PORT: u16 = 1634;

// ============================================================================
// SessionOptions
// ============================================================================

/// Configuration for a [`SyncSession`](crate::SyncSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Full WebSocket URL; wins over everything else.
    pub url: Option<String>,

    /// Page query string, searched for `ws_port`.
    pub query: Option<String>,

    /// Page-level `ws-port` value.
    pub page_ws_port: Option<String>,

    /// Page host.
    pub host: String,

    /// Fallback WebSocket port.
    pub default_port: u16,

    /// UI endpoint base URL. Defaults to `http://{host}:1634`.
    pub ui_base: Option<String>,

    /// UI endpoint path.
    pub ui_path: String,

    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: None,
            query: None,
            page_ws_port: None,
            host: DEFAULT_HOST.to_string(),
            default_port: DEFAULT_WS_PORT,
            ui_base: None,
            ui_path: DEFAULT_UI_PATH.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets an explicit WebSocket URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the page query string (with or without the leading `?`).
    #[inline]
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the page-level `ws-port` value.
    #[inline]
    #[must_use]
    pub fn with_page_ws_port(mut self, port: impl Into<String>) -> Self {
        self.page_ws_port = Some(port.into());
        self
    }

    /// Sets the page host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the fallback WebSocket port.
    #[inline]
    #[must_use]
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Sets the UI endpoint base URL.
    #[inline]
    #[must_use]
    pub fn with_ui_base(mut self, base: impl Into<String>) -> Self {
        self.ui_base = Some(base.into());
        self
    }

    /// Sets the UI endpoint path.
    #[inline]
    #[must_use]
    pub fn with_ui_path(mut self, path: impl Into<String>) -> Self {
        self.ui_path = path.into();
        self
    }

    /// Sets the reconnect backoff.
    #[inline]
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl SessionOptions {
    /// Returns the WebSocket URL these options resolve to.
    #[must_use]
    pub fn ws_url(&self) -> String {
        resolve_ws_url(self)
    }

    /// Returns the UI endpoint base URL.
    #[must_use]
    pub fn ui_base_url(&self) -> String {
        self.ui_base
            .clone()
            .unwrap_or_else(|| format!("http://{}:{DEFAULT_HTTP_PORT}", self.host))
    }
}

// ============================================================================
// Tests
// ============================================================================
