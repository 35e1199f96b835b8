//! Boundary guards: hostname (SSRF), user-data-directory path, and
//! navigation URL scheme.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Asks the user whether connecting to a non-local host is acceptable.
///
/// Implemented by the hosting surface; the gateway only ever calls it for
/// hosts outside the localhost trio.
#[async_trait]
pub trait RemoteHostConfirmer: Send + Sync {
    /// Return `true` to permit a connection to `host`.
    async fn confirm(&self, host: &str) -> bool;
}

/// Hostname guard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostGuardError {
    /// The user declined the remote-host prompt. Fatal for the calling
    /// operation; never falls back to an unsafe default.
    #[error("connection to remote host '{host}' was declined")]
    ConfirmationDeclined {
        /// The host that was refused.
        host: String,
    },
}

/// User-data-directory guard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathGuardError {
    /// Path is not absolute.
    #[error("user data directory must be an absolute path: {path}")]
    NotAbsolute {
        /// The rejected path.
        path: String,
    },
    /// Path still contains `..` segments after normalization.
    #[error("user data directory must not contain '..' segments: {path}")]
    ParentTraversal {
        /// The rejected path.
        path: String,
    },
}

/// Navigation URL guard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlGuardError {
    /// Scheme is explicitly dangerous or otherwise not permitted.
    #[error("navigation to '{scheme}:' URLs is not permitted")]
    ForbiddenScheme {
        /// The rejected scheme.
        scheme: String,
    },
    /// Input is empty after trimming.
    #[error("navigation target is empty")]
    Empty,
}

/// Hosts that never require confirmation.
const TRUSTED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Whether `host` is in the always-permitted localhost set.
pub fn is_trusted_host(host: &str) -> bool {
    TRUSTED_HOSTS
        .iter()
        .any(|trusted| host.eq_ignore_ascii_case(trusted))
}

/// Apply the hostname guard.
///
/// Localhost passes synchronously; any other host requires the confirmer to
/// approve before a connection is attempted. A decline aborts the entire
/// calling operation.
pub async fn authorize_host(
    host: &str,
    confirmer: &dyn RemoteHostConfirmer,
) -> Result<(), HostGuardError> {
    if is_trusted_host(host) {
        return Ok(());
    }
    if confirmer.confirm(host).await {
        warn!(host, "remote host explicitly approved by user");
        Ok(())
    } else {
        warn!(host, "remote host declined, aborting");
        Err(HostGuardError::ConfirmationDeclined {
            host: host.to_owned(),
        })
    }
}

/// Validate a user-data-directory path.
///
/// Lexical check only: the path must be absolute and free of `..` segments
/// once `.` components are dropped. On rejection the caller falls back to an
/// auto-generated temporary directory; this guard never aborts anything.
pub fn validate_user_data_dir(path: &str) -> Result<PathBuf, PathGuardError> {
    let p = Path::new(path);
    if !p.is_absolute() {
        return Err(PathGuardError::NotAbsolute {
            path: path.to_owned(),
        });
    }
    let mut cleaned = PathBuf::new();
    for component in p.components() {
        match component {
            Component::ParentDir => {
                return Err(PathGuardError::ParentTraversal {
                    path: path.to_owned(),
                });
            }
            Component::CurDir => {}
            other => cleaned.push(other),
        }
    }
    Ok(cleaned)
}

/// Schemes rejected outright, checked before any auto-prefixing.
const FORBIDDEN_SCHEMES: &[&str] = &["javascript", "data", "vbscript"];

/// Validate (and possibly auto-prefix) a navigation target.
///
/// Permitted: `http://`, `https://`, `file://`, and exactly `about:blank`.
/// Schemeless input gets `http://` prepended, but only after confirming it
/// does not carry a dangerous scheme.
pub fn validate_navigation_url(input: &str) -> Result<String, UrlGuardError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlGuardError::Empty);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower == "about:blank" {
        return Ok("about:blank".to_owned());
    }
    // Dangerous schemes are checked first so they can never be smuggled
    // through the auto-prefix path.
    for scheme in FORBIDDEN_SCHEMES {
        if lower.starts_with(&format!("{scheme}:")) {
            return Err(UrlGuardError::ForbiddenScheme {
                scheme: (*scheme).to_owned(),
            });
        }
    }
    if lower.starts_with("about:") {
        return Err(UrlGuardError::ForbiddenScheme {
            scheme: "about".to_owned(),
        });
    }
    if let Some((scheme, _)) = lower.split_once("://") {
        return match scheme {
            "http" | "https" | "file" => Ok(trimmed.to_owned()),
            _ => Err(UrlGuardError::ForbiddenScheme {
                scheme: scheme.to_owned(),
            }),
        };
    }
    // No explicit scheme; treat as a host and default to http.
    Ok(format!("http://{trimmed}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(bool);

    #[async_trait]
    impl RemoteHostConfirmer for Always {
        async fn confirm(&self, _host: &str) -> bool {
            self.0
        }
    }

    /// Confirmer that panics if consulted; used to prove localhost skips it.
    struct NeverAsked;

    #[async_trait]
    impl RemoteHostConfirmer for NeverAsked {
        async fn confirm(&self, host: &str) -> bool {
            panic!("confirmer consulted for {host}");
        }
    }

    // ── hostname guard ──────────────────────────────────────────────

    #[test]
    fn localhost_trio_is_trusted() {
        for host in ["localhost", "127.0.0.1", "::1", "[::1]", "LOCALHOST"] {
            assert!(is_trusted_host(host), "{host}");
        }
    }

    #[test]
    fn other_hosts_are_not_trusted() {
        for host in ["10.0.0.5", "example.com", "127.0.0.2", "0.0.0.0", ""] {
            assert!(!is_trusted_host(host), "{host}");
        }
    }

    #[tokio::test]
    async fn localhost_never_consults_confirmer() {
        authorize_host("localhost", &NeverAsked).await.unwrap();
        authorize_host("[::1]", &NeverAsked).await.unwrap();
    }

    #[tokio::test]
    async fn remote_host_requires_confirmation() {
        authorize_host("10.0.0.5", &Always(true)).await.unwrap();
        let err = authorize_host("10.0.0.5", &Always(false)).await.unwrap_err();
        assert_eq!(
            err,
            HostGuardError::ConfirmationDeclined {
                host: "10.0.0.5".into()
            }
        );
    }

    // ── path guard ──────────────────────────────────────────────────

    #[test]
    fn absolute_clean_path_accepted_unchanged() {
        let path = validate_user_data_dir("/tmp/safe-dir").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/safe-dir"));
    }

    #[test]
    fn parent_traversal_rejected() {
        let err = validate_user_data_dir("/tmp/../etc").unwrap_err();
        assert!(matches!(err, PathGuardError::ParentTraversal { .. }));
    }

    #[test]
    fn relative_path_rejected() {
        for path in ["relative/dir", "./here", "../up", ""] {
            assert!(
                matches!(
                    validate_user_data_dir(path),
                    Err(PathGuardError::NotAbsolute { .. })
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn current_dir_segments_are_dropped() {
        let path = validate_user_data_dir("/tmp/./profile").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/profile"));
    }

    #[test]
    fn trailing_parent_rejected() {
        assert!(validate_user_data_dir("/tmp/data/..").is_err());
    }

    // ── url scheme guard ────────────────────────────────────────────

    #[test]
    fn permitted_schemes_pass_unchanged() {
        for url in [
            "http://example.com",
            "https://example.com/path?q=1",
            "file:///home/user/index.html",
        ] {
            assert_eq!(validate_navigation_url(url).unwrap(), url);
        }
    }

    #[test]
    fn about_blank_exactly_is_permitted() {
        assert_eq!(validate_navigation_url("about:blank").unwrap(), "about:blank");
        assert_eq!(validate_navigation_url("About:Blank").unwrap(), "about:blank");
    }

    #[test]
    fn other_about_pages_rejected() {
        for url in ["about:config", "about:flags", "about:"] {
            assert!(
                matches!(
                    validate_navigation_url(url),
                    Err(UrlGuardError::ForbiddenScheme { .. })
                ),
                "{url}"
            );
        }
    }

    #[test]
    fn dangerous_schemes_rejected() {
        for url in [
            "javascript:alert(1)",
            "JAVASCRIPT:alert(1)",
            "data:text/html,<script>x</script>",
            "vbscript:msgbox",
        ] {
            assert!(validate_navigation_url(url).is_err(), "{url}");
        }
    }

    #[test]
    fn unknown_schemes_rejected() {
        for url in ["ftp://host/file", "chrome://settings", "ws://host"] {
            assert!(validate_navigation_url(url).is_err(), "{url}");
        }
    }

    #[test]
    fn schemeless_input_gets_http_prefix() {
        assert_eq!(
            validate_navigation_url("example.com").unwrap(),
            "http://example.com"
        );
        assert_eq!(
            validate_navigation_url("  example.com/page  ").unwrap(),
            "http://example.com/page"
        );
    }

    #[test]
    fn host_with_port_is_schemeless_not_a_scheme() {
        // The part before ':' in "example.com:8080" is not a valid scheme.
        assert_eq!(
            validate_navigation_url("example.com:8080").unwrap(),
            "http://example.com:8080"
        );
        assert_eq!(
            validate_navigation_url("127.0.0.1:3000").unwrap(),
            "http://127.0.0.1:3000"
        );
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(validate_navigation_url("   "), Err(UrlGuardError::Empty));
    }

    #[test]
    fn rejection_messages_are_stable() {
        assert_eq!(
            validate_navigation_url("javascript:void(0)")
                .unwrap_err()
                .to_string(),
            "navigation to 'javascript:' URLs is not permitted"
        );
    }
}
