//! Target descriptors from the CDP HTTP discovery endpoint.

use serde::{Deserialize, Serialize};

/// One inspectable browser context as reported by `/json/list`.
///
/// The browser reports its own local address inside
/// `webSocketDebuggerUrl`; when the endpoint is reached through
/// port-forwarding that address is frequently unreachable, so discovery
/// rewrites it before any relay sees the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredTarget {
    /// Browser-assigned target id.
    pub id: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// WebSocket endpoint for attaching to this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_debugger_url: Option<String>,
    /// Target type, e.g. `page` or `service_worker`.
    #[serde(rename = "type", default)]
    pub target_type: String,
}

impl DiscoveredTarget {
    /// Whether this target is a top-level page.
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}
