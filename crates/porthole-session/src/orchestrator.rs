//! Shared-browser orchestration and attach-by-URL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use porthole_core::DiscoveredTarget;
use porthole_discovery::{CdpAddress, DiscoveryClient, match_targets, rewrite_address};
use porthole_policy::{
    RemoteHostConfirmer, authorize_host, validate_navigation_url, validate_user_data_dir,
};
use porthole_settings::PortholeSettings;

use crate::browser::find_browser;
use crate::error::SessionError;
use crate::launch::{LaunchedBrowser, launch_browser};

/// How an attach request resolved.
#[derive(Debug)]
pub enum AttachOutcome {
    /// A filter was supplied and matched: the rewritten socket URL to dial.
    Resolved(String),
    /// No filter was supplied: the full rewritten target list, for the user
    /// to pick from.
    Candidates(Vec<DiscoveredTarget>),
}

/// Attach to a CDP target, retrying on a fixed interval until `timeout`.
///
/// Every round lists targets and rewrites their socket addresses to `addr`.
/// With a filter, the first match resolves the attach; without one, any
/// non-empty listing is surfaced as candidates. On timeout the error
/// distinguishes "nothing was ever discovered" from "targets existed but
/// none matched".
pub async fn attach_to_target(
    client: &DiscoveryClient,
    addr: &CdpAddress,
    filter: Option<&str>,
    timeout: Duration,
    interval: Duration,
) -> Result<AttachOutcome, SessionError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut any_discovered = false;
    loop {
        let targets = client.list_targets(addr).await;
        if !targets.is_empty() {
            any_discovered = true;
            let rewritten: Vec<DiscoveredTarget> =
                targets.iter().map(|t| rewrite_address(addr, t)).collect();
            match filter {
                None => return Ok(AttachOutcome::Candidates(rewritten)),
                Some(f) => {
                    let matched = match_targets(&rewritten, f);
                    if let Some(url) = matched
                        .iter()
                        .find_map(|t| t.web_socket_debugger_url.clone())
                    {
                        debug!(filter = f, %url, "attached to target");
                        return Ok(AttachOutcome::Resolved(url));
                    }
                }
            }
        }
        if Instant::now() >= deadline {
            let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            return Err(match filter {
                Some(f) if any_discovered => SessionError::NoMatch {
                    filter: f.to_owned(),
                    waited_ms,
                },
                _ => SessionError::NoTargets {
                    waited_ms,
                    last_discovery_error: client.last_error(),
                },
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// Owns the one shared browser and the boundary checks around reaching it.
///
/// Panels never hold the browser handle, only their own relays; the
/// orchestrator is the single writer of the shared slot. Liveness is checked
/// lazily on every read, never by background polling.
pub struct SessionOrchestrator {
    settings: PortholeSettings,
    client: DiscoveryClient,
    confirmer: Arc<dyn RemoteHostConfirmer>,
    shared: Mutex<Option<SharedBrowser>>,
}

struct SharedBrowser {
    browser: LaunchedBrowser,
    /// Keeps a fallback profile directory alive for the browser's lifetime.
    _profile: Option<TempDir>,
}

impl SessionOrchestrator {
    /// Create an orchestrator over the given settings.
    pub fn new(settings: PortholeSettings, confirmer: Arc<dyn RemoteHostConfirmer>) -> Self {
        Self {
            settings,
            client: DiscoveryClient::new(),
            confirmer,
            shared: Mutex::new(None),
        }
    }

    /// The configured CDP endpoint, after the remote-host check.
    ///
    /// A declined confirmation is fatal for the calling operation; there is
    /// no localhost fallback.
    pub async fn resolve_endpoint(&self) -> Result<CdpAddress, SessionError> {
        let conn = &self.settings.connection;
        authorize_host(&conn.hostname, self.confirmer.as_ref()).await?;
        Ok(CdpAddress {
            hostname: conn.hostname.clone(),
            port: conn.port,
            use_https: conn.use_https,
        })
    }

    /// Authorize an explicit socket target before anything dials it.
    ///
    /// The URL must be `ws`/`wss` with a host, and the host goes through the
    /// same remote-host check as a configured endpoint. A decline is fatal
    /// for the caller.
    pub async fn authorize_socket_target(&self, target: &str) -> Result<(), SessionError> {
        let url = Url::parse(target).map_err(|_| SessionError::InvalidTarget {
            target: target.to_owned(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(SessionError::InvalidTarget {
                target: target.to_owned(),
            });
        }
        let Some(host) = url.host_str() else {
            return Err(SessionError::InvalidTarget {
                target: target.to_owned(),
            });
        };
        authorize_host(host, self.confirmer.as_ref()).await?;
        Ok(())
    }

    /// Attach against `addr` using the configured timeout and interval.
    pub async fn attach(
        &self,
        addr: &CdpAddress,
        filter: Option<&str>,
    ) -> Result<AttachOutcome, SessionError> {
        attach_to_target(
            &self.client,
            addr,
            filter,
            Duration::from_millis(self.settings.connection.attach_timeout_ms),
            Duration::from_millis(self.settings.connection.attach_interval_ms),
        )
        .await
    }

    /// Open a preview of `url` and resolve a relay target for it.
    ///
    /// Reuses the shared browser when it is alive (new tab via discovery);
    /// only on absence or tab failure does it launch a fresh one.
    pub async fn open_preview(&self, url: &str) -> Result<AttachOutcome, SessionError> {
        let page_url = validate_navigation_url(url)?;
        if let Some(addr) = self.live_shared_address().await {
            match self.client.open_tab(&addr, &page_url).await {
                Ok(target) => {
                    info!(id = %target.id, "opened tab in shared browser");
                    return self.attach(&addr, Some(&page_url)).await;
                }
                Err(err) => {
                    warn!(error = %err, "shared browser refused a new tab, launching fresh");
                }
            }
        }
        let addr = self.launch_shared(&page_url).await?;
        self.attach(&addr, Some(&page_url)).await
    }

    /// Whether the shared browser exists and its process is still running.
    pub async fn has_live_shared_browser(&self) -> bool {
        self.live_shared_address().await.is_some()
    }

    /// Hook for the hosting surface: the last panel closed, so the shared
    /// browser has no dependents left.
    pub async fn on_last_panel_closed(&self) {
        let mut guard = self.shared.lock().await;
        if let Some(mut shared) = guard.take() {
            info!("last panel closed, shutting the shared browser down");
            shared.browser.kill();
        }
    }

    /// Address of the shared browser if its process is still running,
    /// clearing the stored handle the moment the process is gone.
    async fn live_shared_address(&self) -> Option<CdpAddress> {
        let mut guard = self.shared.lock().await;
        if let Some(shared) = guard.as_mut() {
            if shared.browser.is_alive() {
                return Some(CdpAddress::localhost(shared.browser.port()));
            }
            debug!("shared browser process exited, clearing the handle");
            *guard = None;
        }
        None
    }

    async fn launch_shared(&self, page_url: &str) -> Result<CdpAddress, SessionError> {
        let mut guard = self.shared.lock().await;
        // Another caller may have launched while we waited for the lock.
        if let Some(shared) = guard.as_mut() {
            if shared.browser.is_alive() {
                return Ok(CdpAddress::localhost(shared.browser.port()));
            }
            *guard = None;
        }
        let executable = find_browser().ok_or(SessionError::BrowserNotFound)?;
        let (profile_dir, profile_tmp) = self.resolve_profile_dir()?;
        let browser =
            launch_browser(&executable, &self.settings.launch, &profile_dir, page_url).await?;
        let addr = CdpAddress::localhost(browser.port());
        self.wait_until_queryable(&addr).await?;
        info!(port = browser.port(), "shared browser launched");
        *guard = Some(SharedBrowser {
            browser,
            _profile: profile_tmp,
        });
        Ok(addr)
    }

    /// The profile directory for a launch. A configured directory that fails
    /// the path guard is replaced by a temporary one, never used as-is.
    fn resolve_profile_dir(&self) -> Result<(PathBuf, Option<TempDir>), SessionError> {
        if let Some(raw) = &self.settings.launch.user_data_dir {
            match validate_user_data_dir(raw) {
                Ok(path) => return Ok((path, None)),
                Err(err) => {
                    warn!(error = %err, "configured user data dir rejected, using a temporary profile");
                }
            }
        }
        let tmp = TempDir::new().map_err(|e| SessionError::LaunchFailed {
            context: format!("temporary profile: {e}"),
        })?;
        Ok((tmp.path().to_path_buf(), Some(tmp)))
    }

    /// The browser process reporting ready does not mean the discovery
    /// endpoint is serving yet; poll it briefly before attaching.
    async fn wait_until_queryable(&self, addr: &CdpAddress) -> Result<(), SessionError> {
        const READY_TIMEOUT: Duration = Duration::from_secs(3);
        const READY_INTERVAL: Duration = Duration::from_millis(100);
        let started = Instant::now();
        loop {
            let _ = self.client.list_targets(addr).await;
            if self.client.last_error().is_none() {
                return Ok(());
            }
            if started.elapsed() >= READY_TIMEOUT {
                return Err(SessionError::DiscoveryUnavailable {
                    endpoint: addr.http_base(),
                    waited_ms: u64::try_from(READY_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
                });
            }
            tokio::time::sleep(READY_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use porthole_settings::PortholeSettings;

    use super::*;

    const FAST: Duration = Duration::from_millis(200);
    const TICK: Duration = Duration::from_millis(25);

    struct DenyAll;

    #[async_trait]
    impl RemoteHostConfirmer for DenyAll {
        async fn confirm(&self, _host: &str) -> bool {
            false
        }
    }

    struct AllowAll;

    #[async_trait]
    impl RemoteHostConfirmer for AllowAll {
        async fn confirm(&self, _host: &str) -> bool {
            true
        }
    }

    struct NeverAsked;

    #[async_trait]
    impl RemoteHostConfirmer for NeverAsked {
        async fn confirm(&self, host: &str) -> bool {
            panic!("trusted host '{host}' should not prompt");
        }
    }

    fn addr_for(server: &MockServer) -> CdpAddress {
        let port = server.uri().rsplit(':').next().unwrap().parse().unwrap();
        CdpAddress::localhost(port)
    }

    fn target_json(id: &str, title: &str, url: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "type": "page",
            "url": url,
            "webSocketDebuggerUrl": format!("ws://10.0.0.5:9222/devtools/page/{id}"),
        })
    }

    // ── attach_to_target ────────────────────────────────────────────

    #[tokio::test]
    async fn attach_resolves_matching_target_with_rewritten_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                target_json("A", "Other", "http://other.example/"),
                target_json("B", "Preview", "http://example.com/page"),
            ])))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let addr = addr_for(&server);
        let outcome = attach_to_target(&client, &addr, Some("example.com"), FAST, TICK)
            .await
            .unwrap();
        match outcome {
            AttachOutcome::Resolved(url) => {
                assert_eq!(
                    url,
                    format!("ws://127.0.0.1:{}/devtools/page/B", addr.port)
                );
            }
            other => panic!("expected Resolved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_without_filter_surfaces_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                target_json("A", "One", "http://a/"),
                target_json("B", "Two", "http://b/"),
            ])))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let outcome = attach_to_target(&client, &addr_for(&server), None, FAST, TICK)
            .await
            .unwrap();
        match outcome {
            AttachOutcome::Candidates(targets) => {
                assert_eq!(targets.len(), 2);
                // Addresses are rewritten in the candidate list too.
                assert!(
                    targets[0]
                        .web_socket_debugger_url
                        .as_deref()
                        .unwrap()
                        .starts_with("ws://127.0.0.1:")
                );
            }
            other => panic!("expected Candidates, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn attach_unreachable_endpoint_times_out_as_no_targets() {
        let client = DiscoveryClient::new();
        let err = attach_to_target(&client, &CdpAddress::localhost(1), Some("x"), FAST, TICK)
            .await
            .unwrap_err();
        match err {
            SessionError::NoTargets {
                waited_ms,
                last_discovery_error,
            } => {
                assert!(waited_ms >= FAST.as_millis() as u64);
                assert!(last_discovery_error.is_some());
            }
            other => panic!("expected NoTargets, got {other}"),
        }
    }

    #[tokio::test]
    async fn attach_empty_listing_times_out_as_no_targets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/json.*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let err = attach_to_target(&client, &addr_for(&server), Some("x"), FAST, TICK)
            .await
            .unwrap_err();
        match err {
            SessionError::NoTargets {
                last_discovery_error,
                ..
            } => assert!(last_discovery_error.is_none()),
            other => panic!("expected NoTargets, got {other}"),
        }
    }

    #[tokio::test]
    async fn attach_no_match_is_distinct_from_no_targets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([target_json("A", "One", "http://a/")])),
            )
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let err = attach_to_target(&client, &addr_for(&server), Some("missing"), FAST, TICK)
            .await
            .unwrap_err();
        assert!(
            matches!(err, SessionError::NoMatch { ref filter, .. } if filter == "missing"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn attach_keeps_retrying_until_a_target_appears() {
        let server = MockServer::start().await;
        // Two empty rounds, then the target shows up.
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/list"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([target_json(
                    "L",
                    "Late",
                    "http://late.example/"
                )])),
            )
            .mount(&server)
            .await;

        let client = DiscoveryClient::new();
        let outcome = attach_to_target(
            &client,
            &addr_for(&server),
            Some("late"),
            Duration::from_secs(2),
            TICK,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, AttachOutcome::Resolved(_)));
    }

    // ── orchestrator boundary checks ────────────────────────────────

    #[tokio::test]
    async fn resolve_endpoint_never_prompts_for_localhost() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        let addr = orch.resolve_endpoint().await.unwrap();
        assert_eq!(addr.hostname, "localhost");
        assert_eq!(addr.port, 9222);
    }

    #[tokio::test]
    async fn resolve_endpoint_declined_remote_host_is_fatal() {
        let mut settings = PortholeSettings::default();
        settings.connection.hostname = "build-box.corp.example".into();
        let orch = SessionOrchestrator::new(settings, Arc::new(DenyAll));
        let err = orch.resolve_endpoint().await.unwrap_err();
        assert!(matches!(err, SessionError::HostRejected(_)), "{err}");
    }

    #[tokio::test]
    async fn resolve_endpoint_confirmed_remote_host_passes() {
        let mut settings = PortholeSettings::default();
        settings.connection.hostname = "build-box.corp.example".into();
        settings.connection.use_https = true;
        let orch = SessionOrchestrator::new(settings, Arc::new(AllowAll));
        let addr = orch.resolve_endpoint().await.unwrap();
        assert_eq!(addr.hostname, "build-box.corp.example");
        assert!(addr.use_https);
    }

    #[tokio::test]
    async fn socket_target_on_localhost_never_prompts() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        orch.authorize_socket_target("ws://127.0.0.1:9222/devtools/page/A")
            .await
            .unwrap();
        orch.authorize_socket_target("ws://[::1]:9222/devtools/page/A")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn socket_target_on_remote_host_is_fatal_when_declined() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(DenyAll));
        let err = orch
            .authorize_socket_target("ws://10.0.0.5:9222/devtools/page/A")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HostRejected(_)), "{err}");
    }

    #[tokio::test]
    async fn socket_target_on_remote_host_passes_when_confirmed() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(AllowAll));
        orch.authorize_socket_target("wss://build-box.corp.example:9222/devtools/page/A")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn socket_target_must_be_a_ws_url_with_a_host() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        for bad in [
            "http://10.0.0.5:9222/json",
            "not a url",
            "ws:///devtools/page/A",
        ] {
            let err = orch.authorize_socket_target(bad).await.unwrap_err();
            assert!(matches!(err, SessionError::InvalidTarget { .. }), "{bad}: {err}");
        }
    }

    #[tokio::test]
    async fn open_preview_rejects_forbidden_scheme_before_any_launch() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        let err = orch.open_preview("javascript:alert(1)").await.unwrap_err();
        assert!(matches!(err, SessionError::ForbiddenUrl(_)), "{err}");
        assert!(!orch.has_live_shared_browser().await);
    }

    #[tokio::test]
    async fn no_shared_browser_initially() {
        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        assert!(!orch.has_live_shared_browser().await);
        // The cleanup hook tolerates there being nothing to clean.
        orch.on_last_panel_closed().await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn dead_shared_browser_is_cleared_on_read() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-browser.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'DevTools listening on ws://127.0.0.1:40123/devtools/browser/x' >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let browser = launch_browser(
            &script,
            &porthole_settings::LaunchSettings::default(),
            dir.path(),
            "about:blank",
        )
        .await
        .unwrap();

        let orch = SessionOrchestrator::new(PortholeSettings::default(), Arc::new(NeverAsked));
        *orch.shared.lock().await = Some(SharedBrowser {
            browser,
            _profile: None,
        });
        // The script exits right after printing; give it a moment.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!orch.has_live_shared_browser().await);
        assert!(orch.shared.lock().await.is_none(), "stale handle kept");
    }

    #[tokio::test]
    async fn resolve_profile_dir_rejects_traversal_and_falls_back() {
        let mut settings = PortholeSettings::default();
        settings.launch.user_data_dir = Some("/tmp/../etc".into());
        let orch = SessionOrchestrator::new(settings, Arc::new(NeverAsked));
        let (dir, tmp) = orch.resolve_profile_dir().unwrap();
        assert!(tmp.is_some(), "expected a temporary fallback profile");
        assert!(dir.is_absolute());
        assert_ne!(dir, PathBuf::from("/etc"));
    }

    #[tokio::test]
    async fn resolve_profile_dir_accepts_valid_absolute_path() {
        let mut settings = PortholeSettings::default();
        settings.launch.user_data_dir = Some("/var/lib/porthole/profile".into());
        let orch = SessionOrchestrator::new(settings, Arc::new(NeverAsked));
        let (dir, tmp) = orch.resolve_profile_dir().unwrap();
        assert!(tmp.is_none());
        assert_eq!(dir, PathBuf::from("/var/lib/porthole/profile"));
    }
}
