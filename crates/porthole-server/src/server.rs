//! Axum HTTP + WebSocket surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{Json, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use porthole_channel::{ChannelEvent, encode};
use porthole_relay::ConnectionRelay;
use porthole_session::{AttachOutcome, SessionOrchestrator};
use porthole_settings::PortholeSettings;

use crate::connection::PanelConnection;
use crate::panel::PanelSession;
use crate::traits::{ClipboardAccess, TelemetrySink};

static NEXT_PANEL_ID: AtomicU64 = AtomicU64::new(1);

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Gateway settings.
    pub settings: Arc<PortholeSettings>,
    /// Browser lifecycle owner.
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Telemetry seam.
    pub telemetry: Arc<dyn TelemetrySink>,
    /// Clipboard seam.
    pub clipboard: Arc<dyn ClipboardAccess>,
    /// Connected panel count; reaching zero triggers shared-browser cleanup.
    pub panel_count: Arc<AtomicUsize>,
    /// When the server started.
    pub start_time: Instant,
}

/// The gateway server.
pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    /// Wire the server together.
    pub fn new(
        settings: PortholeSettings,
        orchestrator: Arc<SessionOrchestrator>,
        telemetry: Arc<dyn TelemetrySink>,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> Self {
        Self {
            state: AppState {
                settings: Arc::new(settings),
                orchestrator,
                telemetry,
                clipboard,
                panel_count: Arc::new(AtomicUsize::new(0)),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/panel", get(panel_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until the process ends.
    pub async fn serve(&self) -> std::io::Result<()> {
        let addr = format!(
            "{}:{}",
            self.state.settings.server.host, self.state.settings.server.port
        );
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %listener.local_addr()?, "gateway listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    panels: usize,
    uptime_secs: u64,
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        panels: state.panel_count.load(Ordering::Relaxed),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Debug, Deserialize)]
struct PanelQuery {
    /// Page URL to preview; resolved through the orchestrator.
    url: Option<String>,
    /// Explicit CDP socket URL, bypassing discovery.
    target: Option<String>,
}

/// GET /panel, WebSocket upgrade; one relay per panel.
async fn panel_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<PanelQuery>,
) -> Response {
    ws.on_upgrade(move |socket| panel_socket(socket, state, query))
}

async fn panel_socket(mut socket: WebSocket, state: AppState, query: PanelQuery) {
    let target = match resolve_target(&state, &query).await {
        Ok(target) => target,
        Err(reason) => {
            warn!(%reason, "panel rejected before relay creation");
            if let Some(frame) = encode(ChannelEvent::Error, Some(&json!({ "reason": reason }))) {
                let _ = socket.send(Message::Text(frame.as_str().into())).await;
            }
            let _ = socket.close().await;
            return;
        }
    };

    let panel_id = format!("panel_{}", NEXT_PANEL_ID.fetch_add(1, Ordering::Relaxed));
    let _ = state.panel_count.fetch_add(1, Ordering::SeqCst);
    info!(panel = %panel_id, %target, "panel connected");

    let (frame_tx, mut frame_rx) = mpsc::channel(256);
    let conn = Arc::new(PanelConnection::new(panel_id.clone(), frame_tx));
    let (notify_tx, mut notify_rx) = mpsc::channel(256);
    let relay = ConnectionRelay::spawn(target, notify_tx);
    let session = PanelSession::new(
        conn,
        relay,
        state.telemetry.clone(),
        state.clipboard.clone(),
    );

    let (mut ws_sink, mut ws_stream) = socket.split();
    loop {
        tokio::select! {
            inbound = ws_stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => session.handle_frame(text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(panel = %panel_id, error = %err, "panel socket error");
                    break;
                }
            },
            frame = frame_rx.recv() => match frame {
                Some(frame) => {
                    if ws_sink.send(Message::Text(frame.as_str().into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            notification = notify_rx.recv() => match notification {
                Some(notification) => session.forward_notification(&notification),
                None => break,
            },
        }
    }

    session.dispose().await;
    info!(panel = %panel_id, "panel disconnected");
    if state.panel_count.fetch_sub(1, Ordering::SeqCst) == 1 {
        state.orchestrator.on_last_panel_closed().await;
    }
}

/// Turn the panel's query into a CDP socket URL to relay against.
async fn resolve_target(state: &AppState, query: &PanelQuery) -> Result<String, String> {
    if let Some(target) = &query.target {
        if !target.starts_with("ws://") && !target.starts_with("wss://") {
            return Err("target must be a ws:// or wss:// URL".into());
        }
        // The hostname guard applies to panel-supplied targets too.
        state
            .orchestrator
            .authorize_socket_target(target)
            .await
            .map_err(|err| err.to_string())?;
        return Ok(target.clone());
    }
    let url = query
        .url
        .clone()
        .unwrap_or_else(|| state.settings.launch.default_url.clone());
    match state.orchestrator.open_preview(&url).await {
        Ok(AttachOutcome::Resolved(socket_url)) => Ok(socket_url),
        Ok(AttachOutcome::Candidates(_)) => {
            Err("multiple targets matched; supply an explicit target".into())
        }
        Err(err) => Err(err.to_string()),
    }
}
