//! The per-panel connection state machine.

use std::future::Future;
use std::pin::Pin;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use porthole_channel::payloads::validate_websocket_payload;
use porthole_core::cdp::{CdpMessage, CommandId};
use porthole_policy::allowlist::{GateVerdict, check_command};

use crate::notifications::RelayNotification;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = Result<WsStream, WsError>> + Send>>;

/// After this many dropped panel messages on one relay, further drops log at
/// debug instead of warn. A looping panel otherwise floods the log.
const REJECTION_WARN_BURST: u64 = 5;

const INPUT_QUEUE_DEPTH: usize = 64;

/// Handle to a relay task. One per panel, bound to one target URL for its
/// whole life.
///
/// Dropping the handle (or calling [`dispose`](Self::dispose)) tears the
/// connection down; the handle never reconnects on its own, only in response
/// to `ready` or a command arriving without a live socket.
#[derive(Debug)]
pub struct ConnectionRelay {
    input_tx: mpsc::Sender<RelayInput>,
    _task: JoinHandle<()>,
}

impl ConnectionRelay {
    /// Spawn a relay for `target_url`, emitting notifications on `notify`.
    ///
    /// The relay starts idle; nothing connects until the panel signals
    /// `ready` or forwards a command.
    pub fn spawn(target_url: impl Into<String>, notify: mpsc::Sender<RelayNotification>) -> Self {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);
        let task = RelayTask {
            target_url: target_url.into(),
            notify,
            next_id: 1,
            pending: Vec::new(),
            rejections: 0,
        };
        let handle = tokio::spawn(task.run(input_rx));
        Self {
            input_tx,
            _task: handle,
        }
    }

    /// The panel signalled `ready`: start a fresh connection, discarding any
    /// prior socket, attempt, and queued commands.
    pub async fn handle_ready(&self) {
        let _ = self.input_tx.send(RelayInput::Ready).await;
    }

    /// The panel asked to forward a command. `args` is the decoded channel
    /// payload, [`Value::Null`] when the frame carried none.
    pub async fn handle_websocket(&self, args: Value) {
        let _ = self.input_tx.send(RelayInput::Websocket(args)).await;
    }

    /// Tear the connection down and stop the task. Idempotent.
    pub async fn dispose(&self) {
        let _ = self.input_tx.send(RelayInput::Dispose).await;
    }
}

enum RelayInput {
    Ready,
    Websocket(Value),
    Dispose,
}

/// Connection lifecycle. `Closed` is terminal for the socket, not the relay;
/// a later `ready` or command starts over from `Connecting`.
enum Link {
    Idle,
    Connecting(ConnectFuture),
    Open(WsStream),
    Closed,
}

enum LinkEvent {
    Connected(Result<WsStream, WsError>),
    Inbound(Option<Result<Message, WsError>>),
}

/// Resolve the next socket event for the current phase. Pends forever when
/// there is neither an attempt nor a socket, leaving the input queue as the
/// only wake source.
async fn poll_link(link: &mut Link) -> LinkEvent {
    match link {
        Link::Connecting(fut) => LinkEvent::Connected(fut.as_mut().await),
        Link::Open(ws) => LinkEvent::Inbound(ws.next().await),
        Link::Idle | Link::Closed => std::future::pending().await,
    }
}

struct RelayTask {
    target_url: String,
    notify: mpsc::Sender<RelayNotification>,
    /// Relay-assigned CDP command ids. Monotonic across reconnects so a
    /// response can never be attributed to a command from a previous socket.
    next_id: CommandId,
    /// Commands accepted while no socket is open yet, flushed in arrival
    /// order the moment the handshake completes.
    pending: Vec<String>,
    rejections: u64,
}

impl RelayTask {
    async fn run(mut self, mut input_rx: mpsc::Receiver<RelayInput>) {
        let mut link = Link::Idle;
        loop {
            tokio::select! {
                input = input_rx.recv() => match input {
                    Some(RelayInput::Ready) => self.on_ready(&mut link),
                    Some(RelayInput::Websocket(args)) => {
                        self.on_websocket(args, &mut link).await;
                    }
                    Some(RelayInput::Dispose) | None => {
                        self.shutdown(&mut link).await;
                        break;
                    }
                },
                event = poll_link(&mut link) => match event {
                    LinkEvent::Connected(Ok(ws)) => self.on_connected(ws, &mut link).await,
                    LinkEvent::Connected(Err(err)) => {
                        warn!(url = %self.target_url, error = %err, "CDP connect failed");
                        self.pending.clear();
                        link = Link::Closed;
                        self.notify(RelayNotification::SocketError {
                            reason: err.to_string(),
                        })
                        .await;
                    }
                    LinkEvent::Inbound(Some(Ok(Message::Text(text)))) => {
                        self.on_inbound(text.as_str()).await;
                    }
                    LinkEvent::Inbound(Some(Ok(Message::Close(_))) | None) => {
                        debug!(url = %self.target_url, "CDP socket closed by remote");
                        link = Link::Closed;
                        self.notify(RelayNotification::Closed {
                            reason: "connection closed".into(),
                        })
                        .await;
                    }
                    LinkEvent::Inbound(Some(Ok(_))) => {
                        // Binary, ping and pong frames are not CDP traffic.
                    }
                    LinkEvent::Inbound(Some(Err(err))) => {
                        warn!(url = %self.target_url, error = %err, "CDP socket error");
                        link = Link::Closed;
                        self.notify(RelayNotification::SocketError {
                            reason: err.to_string(),
                        })
                        .await;
                    }
                },
            }
        }
    }

    fn on_ready(&mut self, link: &mut Link) {
        // Fresh start. A prior socket or half-finished attempt belongs to a
        // panel document that no longer exists, so it goes silently; the
        // panel only hears about the connection it asked for.
        if let Link::Open(mut ws) = std::mem::replace(link, Link::Idle) {
            drop(tokio::spawn(async move {
                let _ = ws.close(None).await;
            }));
        }
        self.pending.clear();
        self.start_connect(link);
    }

    fn start_connect(&self, link: &mut Link) {
        debug!(url = %self.target_url, "connecting to CDP target");
        let url = self.target_url.clone();
        *link = Link::Connecting(Box::pin(async move {
            connect_async(url).await.map(|(ws, _response)| ws)
        }));
    }

    async fn on_connected(&mut self, mut ws: WsStream, link: &mut Link) {
        debug!(url = %self.target_url, queued = self.pending.len(), "CDP socket open");
        for frame in std::mem::take(&mut self.pending) {
            if let Err(err) = ws.send(Message::Text(frame.into())).await {
                warn!(url = %self.target_url, error = %err, "flush of queued command failed");
                *link = Link::Closed;
                self.notify(RelayNotification::SocketError {
                    reason: err.to_string(),
                })
                .await;
                return;
            }
        }
        *link = Link::Open(ws);
        self.notify(RelayNotification::Open).await;
    }

    async fn on_websocket(&mut self, args: Value, link: &mut Link) {
        let payload = match validate_websocket_payload(&args) {
            Ok(payload) => payload,
            Err(err) => {
                self.reject(err.to_string()).await;
                return;
            }
        };
        if let GateVerdict::Rejected(rejection) = check_command(&payload.message) {
            self.reject(rejection.to_string()).await;
            return;
        }
        let Some(frame) = self.stamp_id(&payload.message) else {
            self.reject("command is not a JSON object".into()).await;
            return;
        };
        match link {
            Link::Open(_) => {}
            Link::Connecting(_) => {
                self.pending.push(frame);
                return;
            }
            Link::Idle | Link::Closed => {
                // No socket and no attempt in flight. Connect on demand; the
                // command rides the pending queue.
                self.pending.push(frame);
                self.start_connect(link);
                return;
            }
        }
        let sent = match link {
            Link::Open(ws) => ws.send(Message::Text(frame.into())).await,
            _ => return,
        };
        if let Err(err) = sent {
            warn!(url = %self.target_url, error = %err, "CDP send failed");
            *link = Link::Closed;
            self.notify(RelayNotification::SocketError {
                reason: err.to_string(),
            })
            .await;
        }
    }

    /// Overwrite whatever `id` the panel supplied with the relay's own
    /// monotonic counter. The panel's numbering is untrusted input.
    fn stamp_id(&mut self, raw: &str) -> Option<String> {
        let mut value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object_mut()?;
        let _ = obj.insert("id".into(), Value::from(self.next_id));
        self.next_id += 1;
        serde_json::to_string(&value).ok()
    }

    async fn on_inbound(&mut self, text: &str) {
        self.notify(RelayNotification::Message(text.to_owned())).await;
        if let Some(url) = navigation_url(text) {
            self.notify(RelayNotification::Navigation(url)).await;
        }
    }

    async fn reject(&mut self, reason: String) {
        self.rejections += 1;
        if self.rejections <= REJECTION_WARN_BURST {
            warn!(%reason, "dropped panel command");
        } else {
            debug!(%reason, "dropped panel command");
        }
        self.notify(RelayNotification::ParseError(reason)).await;
    }

    async fn shutdown(&mut self, link: &mut Link) {
        if let Link::Open(mut ws) = std::mem::replace(link, Link::Closed) {
            let _ = ws.close(None).await;
        }
        self.pending.clear();
    }

    async fn notify(&self, notification: RelayNotification) {
        if self.notify.send(notification).await.is_err() {
            debug!(url = %self.target_url, "notification receiver gone");
        }
    }
}

/// Extract the new page URL from the two CDP events that report navigation.
/// Best effort: anything that does not parse is simply not a navigation.
fn navigation_url(text: &str) -> Option<String> {
    let message: CdpMessage = serde_json::from_str(text).ok()?;
    let CdpMessage::Event(event) = message else {
        return None;
    };
    let params = event.params?;
    let url = match event.method.as_str() {
        "Page.frameNavigated" => params.get("frame")?.get("url")?,
        "Target.targetInfoChanged" => params.get("targetInfo")?.get("url")?,
        _ => return None,
    };
    url.as_str().map(str::to_owned)
}
