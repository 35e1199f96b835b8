//! # porthole-gateway
//!
//! Gateway binary: loads settings, wires the orchestrator and default
//! collaborator seams, and serves the panel WebSocket surface.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use porthole_policy::RemoteHostConfirmer;
use porthole_server::{GatewayServer, LogTelemetrySink, NoClipboard};
use porthole_session::SessionOrchestrator;
use porthole_settings::{load_settings, load_settings_from_path};

/// Mediated CDP gateway for untrusted panels.
#[derive(Parser, Debug)]
#[command(name = "porthole-gateway", about = "Mediated CDP gateway for untrusted panels")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the settings file (default `~/.porthole/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Remote CDP hosts to trust without prompting. Repeatable. Anything
    /// not listed here (and not localhost) is refused.
    #[arg(long = "allow-remote-host")]
    allow_remote_hosts: Vec<String>,
}

/// Headless stand-in for an interactive confirmation prompt: a remote host
/// is approved only when it was allow-listed on the command line.
struct CliHostConfirmer {
    allowed: Vec<String>,
}

#[async_trait]
impl RemoteHostConfirmer for CliHostConfirmer {
    async fn confirm(&self, host: &str) -> bool {
        let approved = self
            .allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host));
        if !approved {
            warn!(host, "remote CDP host refused; pass --allow-remote-host to permit it");
        }
        approved
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => load_settings().context("loading settings")?,
    };
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    let confirmer = Arc::new(CliHostConfirmer {
        allowed: cli.allow_remote_hosts,
    });
    let orchestrator = Arc::new(SessionOrchestrator::new(settings.clone(), confirmer));
    let server = GatewayServer::new(
        settings,
        orchestrator,
        Arc::new(LogTelemetrySink),
        Arc::new(NoClipboard),
    );
    server.serve().await.context("serving")?;
    Ok(())
}
