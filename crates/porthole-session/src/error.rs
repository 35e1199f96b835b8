//! Session-level errors.

use thiserror::Error;

use porthole_policy::{HostGuardError, UrlGuardError};

/// Failures in browser lifecycle and attach.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No usable browser executable on the system.
    #[error("no browser executable found; install Chrome or Chromium, or set PORTHOLE_BROWSER")]
    BrowserNotFound,

    /// Spawning the browser process failed.
    #[error("failed to launch browser: {context}")]
    LaunchFailed {
        /// What went wrong during launch.
        context: String,
    },

    /// The process started but never reported a DevTools endpoint.
    #[error("browser did not report a DevTools endpoint within {timeout_ms}ms")]
    EndpointTimeout {
        /// How long we waited.
        timeout_ms: u64,
    },

    /// The discovery endpoint of a freshly launched browser never answered.
    #[error("discovery endpoint {endpoint} not queryable within {waited_ms}ms")]
    DiscoveryUnavailable {
        /// The endpoint base URL.
        endpoint: String,
        /// How long we waited.
        waited_ms: u64,
    },

    /// The attach loop timed out with zero targets ever discovered.
    #[error("no CDP targets discovered within {waited_ms}ms")]
    NoTargets {
        /// How long the loop ran.
        waited_ms: u64,
        /// Last discovery failure, if the endpoint was unreachable.
        last_discovery_error: Option<String>,
    },

    /// Targets were discovered but none matched the filter. Distinct from
    /// [`Self::NoTargets`] so callers can suggest different next steps.
    #[error("no CDP target matched '{filter}' within {waited_ms}ms")]
    NoMatch {
        /// The URL-or-title filter that matched nothing.
        filter: String,
        /// How long the loop ran.
        waited_ms: u64,
    },

    /// A panel-supplied socket target is not a usable `ws`/`wss` URL.
    #[error("'{target}' is not a valid ws:// or wss:// target")]
    InvalidTarget {
        /// The rejected target URL.
        target: String,
    },

    /// The user declined connecting to a remote host.
    #[error(transparent)]
    HostRejected(#[from] HostGuardError),

    /// Navigation URL with a forbidden scheme.
    #[error(transparent)]
    ForbiddenUrl(#[from] UrlGuardError),
}
