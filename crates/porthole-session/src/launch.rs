//! Launching a browser with a DevTools endpoint.
//!
//! The debugging port is always OS-assigned (`--remote-debugging-port=0`);
//! the actual port comes from parsing the `DevTools listening on ws://...`
//! line the browser writes to stderr. Trusting the requested port would race
//! against other processes grabbing it first.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use porthole_settings::LaunchSettings;

use crate::error::SessionError;

const ENDPOINT_TIMEOUT_MS: u64 = 10_000;

/// Flags the launcher owns. User-supplied duplicates are dropped so settings
/// cannot silently redirect the profile or the debugging port.
const MANAGED_FLAGS: &[&str] = &[
    "--remote-debugging-port",
    "--user-data-dir",
    "--headless",
    "--disable-blink-features",
];

/// Always part of the default set, so a user copy is deduplicated rather
/// than dropped as a managed-flag collision.
const AUTOMATION_CARVE_OUT: &str = "--disable-blink-features=AutomationControlled";

/// Assemble the full browser command line.
pub fn build_launch_args(
    settings: &LaunchSettings,
    user_data_dir: &Path,
    page_url: &str,
) -> Vec<String> {
    let mut args = vec![
        "--remote-debugging-port=0".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        AUTOMATION_CARVE_OUT.to_string(),
    ];
    if settings.headless {
        args.push("--headless=new".to_string());
    }
    for extra in &settings.browser_args {
        if extra == AUTOMATION_CARVE_OUT {
            continue;
        }
        if is_managed(extra) {
            debug!(arg = %extra, "dropping user arg that collides with a managed flag");
            continue;
        }
        args.push(extra.clone());
    }
    args.push(page_url.to_string());
    args
}

fn is_managed(arg: &str) -> bool {
    MANAGED_FLAGS
        .iter()
        .any(|flag| arg == *flag || arg.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
}

/// A launched browser process and its parsed DevTools endpoint.
#[derive(Debug)]
pub struct LaunchedBrowser {
    child: Child,
    port: u16,
    ws_endpoint: String,
}

impl LaunchedBrowser {
    /// The OS-assigned debugging port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The browser-level WebSocket endpoint as reported by the process.
    pub fn ws_endpoint(&self) -> &str {
        &self.ws_endpoint
    }

    /// Whether the process is still running. Reaps the child if it exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Ask the OS to terminate the process. Best effort.
    pub fn kill(&mut self) {
        if let Err(err) = self.child.start_kill() {
            debug!(error = %err, "browser kill failed (already gone?)");
        }
    }
}

/// Spawn the browser and wait for its DevTools endpoint.
pub async fn launch_browser(
    executable: &Path,
    settings: &LaunchSettings,
    user_data_dir: &Path,
    page_url: &str,
) -> Result<LaunchedBrowser, SessionError> {
    let args = build_launch_args(settings, user_data_dir, page_url);
    debug!(executable = %executable.display(), "launching browser");
    let mut child = Command::new(executable)
        .args(&args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SessionError::LaunchFailed {
            context: e.to_string(),
        })?;

    let Some(stderr) = child.stderr.take() else {
        child_kill_best_effort(&mut child);
        return Err(SessionError::LaunchFailed {
            context: "stderr was not captured".into(),
        });
    };

    let endpoint = match timeout(
        Duration::from_millis(ENDPOINT_TIMEOUT_MS),
        read_devtools_endpoint(stderr),
    )
    .await
    {
        Ok(Some(url)) => url,
        Ok(None) => {
            child_kill_best_effort(&mut child);
            return Err(SessionError::LaunchFailed {
                context: "browser exited before reporting a DevTools endpoint".into(),
            });
        }
        Err(_) => {
            child_kill_best_effort(&mut child);
            return Err(SessionError::EndpointTimeout {
                timeout_ms: ENDPOINT_TIMEOUT_MS,
            });
        }
    };

    let Some(port) = endpoint.port() else {
        child_kill_best_effort(&mut child);
        return Err(SessionError::LaunchFailed {
            context: format!("DevTools endpoint reports no port: {endpoint}"),
        });
    };

    debug!(port, endpoint = %endpoint, "browser reported DevTools endpoint");
    Ok(LaunchedBrowser {
        child,
        port,
        ws_endpoint: endpoint.to_string(),
    })
}

fn child_kill_best_effort(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "browser kill failed");
    }
}

/// Scan stderr for the `DevTools listening on ws://...` line.
async fn read_devtools_endpoint(stderr: ChildStderr) -> Option<Url> {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(rest) = line.strip_prefix("DevTools listening on ") {
            match Url::parse(rest.trim()) {
                Ok(url) => {
                    // Keep draining so the pipe never backs up.
                    drop(tokio::spawn(drain_stderr(lines)));
                    return Some(url);
                }
                Err(err) => {
                    warn!(line = rest, error = %err, "unparseable DevTools endpoint line");
                }
            }
        }
    }
    None
}

async fn drain_stderr(mut lines: Lines<BufReader<ChildStderr>>) {
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "porthole_session::browser_stderr", "{line}");
    }
}
