//! # porthole-server
//!
//! The panel-facing surface of the gateway: an axum WebSocket endpoint
//! speaking the channel line protocol, one [`ConnectionRelay`] per panel,
//! and the collaborator seams (telemetry, clipboard) the channel's
//! non-CDP events dispatch into.
//!
//! [`ConnectionRelay`]: porthole_relay::ConnectionRelay

#![deny(unsafe_code)]

pub mod connection;
pub mod panel;
pub mod server;
pub mod traits;

pub use connection::PanelConnection;
pub use panel::PanelSession;
pub use server::{AppState, GatewayServer};
pub use traits::{ClipboardAccess, LogTelemetrySink, NoClipboard, TelemetrySink};
