//! Error types for the sync client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Component-level operations return [`Result<T>`] which uses [`Error`].
//! The [`SyncSession`](crate::SyncSession) facade contains every failure,
//! logs it and reports a plain outcome instead.
//!
//! ```ignore
//! use cacao_sync::{Error, Result};
//!
//! async fn example(transport: &Transport) -> Result<()> {
//!     transport.send(&OutboundMessage::Refresh).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::NotConnected`], [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::ReconnectExhausted`] |
//! | Protocol | [`Error::MalformedFrame`] |
//! | Refresh | [`Error::ServerError`], [`Error::RendererUnavailable`], [`Error::Render`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session options cannot produce a usable setup.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL could not be parsed or has an unsupported scheme.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Send attempted while the transport is not open.
    #[error("Not connected")]
    NotConnected,

    /// Socket-level failure.
    ///
    /// Surfaces as a lifecycle event to the reconnection supervisor.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an operation was pending on it.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Reconnect budget spent; no further automatic reconnection.
    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted {
        /// Attempts made in the failed streak.
        attempts: u32,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be decoded.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Description of the decoding failure.
        message: String,
    },

    // ========================================================================
    // Refresh Errors
    // ========================================================================
    /// UI endpoint answered with a non-success status.
    #[error("Server returned {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },

    /// No renderer is installed.
    #[error("Renderer not available")]
    RendererUnavailable,

    /// Renderer rejected the payload.
    #[error("Render failed: {message}")]
    Render {
        /// Description of the render failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a server error from an HTTP status.
    #[inline]
    pub fn server_error(status: u16) -> Self {
        Self::ServerError { status }
    }

    /// Creates a render error.
    #[inline]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::ReconnectExhausted { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came out of a refresh cycle.
    #[inline]
    #[must_use]
    pub fn is_refresh_error(&self) -> bool {
        matches!(
            self,
            Self::ServerError { .. } | Self::RendererUnavailable | Self::Render { .. } | Self::Http(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotConnected | Self::Connection { .. } | Self::ConnectionClosed => true,
            Self::ServerError { status } => *status >= 500,
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
