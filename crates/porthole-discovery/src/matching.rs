//! Target matching and socket address rewriting.

use tracing::debug;
use url::Url;

use porthole_core::DiscoveredTarget;

use crate::address::CdpAddress;

/// Match targets against a URL-or-title filter.
///
/// Case-insensitive substring match against each target's URL and title.
/// Returns all matches, preserving discovery order.
pub fn match_targets(targets: &[DiscoveredTarget], filter: &str) -> Vec<DiscoveredTarget> {
    let needle = filter.to_lowercase();
    targets
        .iter()
        .filter(|t| {
            t.url.to_lowercase().contains(&needle) || t.title.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Rewrite a target's `webSocketDebuggerUrl` to the address actually used to
/// reach the discovery endpoint, and align the `ws`/`wss` scheme with it.
///
/// Targets without a debugger URL, or with one that does not parse, are
/// returned unchanged.
pub fn rewrite_address(addr: &CdpAddress, target: &DiscoveredTarget) -> DiscoveredTarget {
    let mut rewritten = target.clone();
    let Some(ws_url) = target.web_socket_debugger_url.as_deref() else {
        return rewritten;
    };
    let Ok(mut url) = Url::parse(ws_url) else {
        debug!(ws_url, "unparseable webSocketDebuggerUrl left unchanged");
        return rewritten;
    };
    if url.set_scheme(addr.ws_scheme()).is_err() {
        debug!(ws_url, "webSocketDebuggerUrl scheme rewrite refused");
        return rewritten;
    }
    let host_ok = url
        .set_host(Some(&addr.hostname))
        .or_else(|_| url.set_host(Some(&addr.url_host())))
        .is_ok();
    if !host_ok || url.set_port(Some(addr.port)).is_err() {
        debug!(ws_url, "webSocketDebuggerUrl address rewrite refused");
        return rewritten;
    }
    rewritten.web_socket_debugger_url = Some(url.to_string());
    rewritten
}
