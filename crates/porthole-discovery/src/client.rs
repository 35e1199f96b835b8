//! HTTP client for the CDP discovery endpoint.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use porthole_core::DiscoveredTarget;

use crate::address::CdpAddress;

/// Discovery request failure.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The HTTP request itself failed (refused, timed out, bad body).
    #[error("discovery request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("discovery endpoint returned HTTP {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },
    /// A constructed endpoint URL failed to parse.
    #[error("invalid discovery URL: {0}")]
    BadUrl(#[from] url::ParseError),
}

/// Client for `/json`-family endpoints on a CDP target host.
pub struct DiscoveryClient {
    http: reqwest::Client,
    last_error: Mutex<Option<String>>,
}

impl Default for DiscoveryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryClient {
    /// Create a client with a short per-request timeout; discovery is always
    /// wrapped in its own retry loop, so individual requests stay snappy.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            http,
            last_error: Mutex::new(None),
        }
    }

    /// List inspectable targets.
    ///
    /// Tries `/json/list` first, then falls back to `/json`. Never errors to
    /// the caller: on total failure it returns an empty list and retains the
    /// last error for [`Self::last_error`].
    pub async fn list_targets(&self, addr: &CdpAddress) -> Vec<DiscoveredTarget> {
        let mut last = None;
        for path in ["/json/list", "/json"] {
            match self.fetch_target_list(addr, path).await {
                Ok(targets) => {
                    debug!(path, count = targets.len(), "discovered targets");
                    *self.last_error.lock() = None;
                    return targets;
                }
                Err(e) => {
                    debug!(path, error = %e, "target listing failed");
                    last = Some(e.to_string());
                }
            }
        }
        warn!(endpoint = %addr.http_base(), "all discovery endpoints failed");
        *self.last_error.lock() = last;
        Vec::new()
    }

    /// The last listing failure, for diagnostic reporting. Cleared by the
    /// next successful listing.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Open a new tab via `GET /json/new?<url>`.
    pub async fn open_tab(
        &self,
        addr: &CdpAddress,
        url: &str,
    ) -> Result<DiscoveredTarget, DiscoveryError> {
        let mut endpoint = url::Url::parse(&format!("{}/json/new", addr.http_base()))?;
        endpoint.set_query(Some(url));
        let response = self.http.get(endpoint).send().await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                status: response.status().as_u16(),
                path: "/json/new".to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// Bring a tab to the foreground via `GET /json/activate/{id}`.
    pub async fn activate_tab(
        &self,
        addr: &CdpAddress,
        target_id: &str,
    ) -> Result<(), DiscoveryError> {
        self.simple_get(addr, &format!("/json/activate/{target_id}"))
            .await
    }

    /// Close a tab via `GET /json/close/{id}`.
    pub async fn close_tab(
        &self,
        addr: &CdpAddress,
        target_id: &str,
    ) -> Result<(), DiscoveryError> {
        self.simple_get(addr, &format!("/json/close/{target_id}"))
            .await
    }

    async fn simple_get(&self, addr: &CdpAddress, path: &str) -> Result<(), DiscoveryError> {
        let response = self
            .http
            .get(format!("{}{path}", addr.http_base()))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DiscoveryError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            })
        }
    }

    async fn fetch_target_list(
        &self,
        addr: &CdpAddress,
        path: &str,
    ) -> Result<Vec<DiscoveredTarget>, DiscoveryError> {
        let response = self
            .http
            .get(format!("{}{path}", addr.http_base()))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DiscoveryError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}
