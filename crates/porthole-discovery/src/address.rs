//! The address of a CDP discovery endpoint.

/// Where a CDP HTTP/WS endpoint lives, from the gateway's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdpAddress {
    /// Hostname or IP (IPv6 accepted with or without brackets).
    pub hostname: String,
    /// Port the discovery HTTP endpoint listens on.
    pub port: u16,
    /// Use https/wss instead of http/ws.
    pub use_https: bool,
}

impl CdpAddress {
    /// Localhost address on the given port, plain http.
    pub fn localhost(port: u16) -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port,
            use_https: false,
        }
    }

    /// Base URL of the discovery HTTP endpoint, e.g. `http://127.0.0.1:9222`.
    pub fn http_base(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.url_host(), self.port)
    }

    /// WebSocket scheme matching `use_https`.
    pub fn ws_scheme(&self) -> &'static str {
        if self.use_https { "wss" } else { "ws" }
    }

    /// Hostname in URL form: bare IPv6 addresses get bracketed.
    pub fn url_host(&self) -> String {
        if self.hostname.contains(':') && !self.hostname.starts_with('[') {
            format!("[{}]", self.hostname)
        } else {
            self.hostname.clone()
        }
    }
}
