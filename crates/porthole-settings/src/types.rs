//! Settings types: connection, launch, and panel-server sections.

use serde::{Deserialize, Serialize};

/// Root settings document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortholeSettings {
    /// How to reach (or retry reaching) the CDP endpoint.
    pub connection: ConnectionSettings,
    /// How to launch a browser when no endpoint is reachable.
    pub launch: LaunchSettings,
    /// Panel-facing WebSocket server.
    pub server: ServerSettings,
}

/// CDP endpoint connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// Hostname of the CDP HTTP discovery endpoint.
    pub hostname: String,
    /// Port of the CDP HTTP discovery endpoint.
    pub port: u16,
    /// Reach the endpoint over https/wss instead of http/ws.
    pub use_https: bool,
    /// Overall attach timeout in milliseconds.
    pub attach_timeout_ms: u64,
    /// Fixed interval between attach retries in milliseconds.
    pub attach_interval_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 9222,
            use_https: false,
            attach_timeout_ms: 10_000,
            attach_interval_ms: 500,
        }
    }
}

/// Browser launch settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchSettings {
    /// Launch the browser headless.
    pub headless: bool,
    /// User data directory. Validated by the path guard; invalid values
    /// fall back to an auto-generated temporary directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<String>,
    /// Extra arguments appended to the browser command line.
    pub browser_args: Vec<String>,
    /// Page opened when no explicit target URL is given.
    pub default_url: String,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            headless: false,
            user_data_dir: None,
            browser_args: Vec::new(),
            default_url: "about:blank".to_string(),
        }
    }
}

/// Panel server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address for the panel WebSocket server.
    pub host: String,
    /// Bind port (0 for auto-assign).
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3930,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_cdp() {
        let settings = PortholeSettings::default();
        assert_eq!(settings.connection.hostname, "localhost");
        assert_eq!(settings.connection.port, 9222);
        assert!(!settings.connection.use_https);
        assert_eq!(settings.connection.attach_timeout_ms, 10_000);
        assert_eq!(settings.connection.attach_interval_ms, 500);
    }

    #[test]
    fn launch_defaults_are_headful_blank_page() {
        let launch = LaunchSettings::default();
        assert!(!launch.headless);
        assert!(launch.user_data_dir.is_none());
        assert!(launch.browser_args.is_empty());
        assert_eq!(launch.default_url, "about:blank");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(PortholeSettings::default()).unwrap();
        assert!(json["connection"].get("useHttps").is_some());
        assert!(json["connection"].get("attachTimeoutMs").is_some());
        assert!(json["launch"].get("defaultUrl").is_some());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: PortholeSettings =
            serde_json::from_str(r#"{"connection": {"port": 9333}}"#).unwrap();
        assert_eq!(settings.connection.port, 9333);
        assert_eq!(settings.connection.hostname, "localhost");
        assert_eq!(settings.server.port, 3930);
    }

    #[test]
    fn none_user_data_dir_omitted_in_json() {
        let json = serde_json::to_value(LaunchSettings::default()).unwrap();
        assert!(json.get("userDataDir").is_none());
    }
}
