//! UI endpoint client.
//!
//! Every fetch bypasses caches: the URL carries `force=true` plus a
//! millisecond timestamp, and the request sends no-cache headers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use super::render::UiPayload;

// ============================================================================
// Constants
// ============================================================================

/// Default UI endpoint path.
pub const DEFAULT_UI_PATH: &str = "/api/ui";

// ============================================================================
// UiSource
// ============================================================================

/// Provider of fresh UI payloads.
#[async_trait]
pub trait UiSource: Send + Sync {
    /// Fetches the current UI.
    ///
    /// `location` is the page fragment; an empty or absent value means no
    /// page hint is sent.
    ///
    /// # Errors
    ///
    /// - [`Error::ServerError`] on a non-success status
    /// - [`Error::Http`] on network or body decode failure
    async fn fetch_ui(&self, location: Option<&str>) -> Result<UiPayload>;
}

// ============================================================================
// HttpUiSource
// ============================================================================

/// [`UiSource`] over HTTP.
#[derive(Clone)]
pub struct HttpUiSource {
    client: Client,
    endpoint: Url,
}

impl fmt::Debug for HttpUiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUiSource")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpUiSource {
    /// Creates a source for an absolute endpoint URL.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    /// Creates a source from a base URL and path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the pair does not form an http(s) URL.
    pub fn from_base(base: &str, path: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| Error::invalid_url(base, e.to_string()))?;
        let endpoint = base
            .join(path)
            .map_err(|e| Error::invalid_url(path, e.to_string()))?;

        match endpoint.scheme() {
            "http" | "https" => Ok(Self::new(endpoint)),
            other => Err(Error::invalid_url(
                endpoint.as_str(),
                format!("unsupported scheme '{other}'"),
            )),
        }
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the endpoint without query parameters.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Builds the cache-busting request URL.
    #[must_use]
    pub fn request_url(&self, location: Option<&str>, timestamp_ms: u128) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("force", "true");
            if let Some(hash) = location.filter(|l| !l.is_empty()) {
                query.append_pair("_hash", hash);
            }
            query.append_pair("t", &timestamp_ms.to_string());
        }
        url
    }
}

#[async_trait]
impl UiSource for HttpUiSource {
    async fn fetch_ui(&self, location: Option<&str>) -> Result<UiPayload> {
        let url = self.request_url(location, now_ms());
        debug!(url = %url, "Fetching UI");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .header(EXPIRES, "0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::server_error(status.as_u16()));
        }

        Ok(response.json::<UiPayload>().await?)
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
