//! Per-panel connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::mpsc;

use porthole_channel::{ChannelEvent, encode};

/// A connected panel's outbound half.
///
/// Sends never block: a slow panel gets frames dropped (and counted) rather
/// than stalling the relay behind it.
pub struct PanelConnection {
    /// Unique connection ID.
    pub id: String,
    /// Send channel to the panel's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Count of frames dropped due to a full channel.
    dropped_frames: AtomicU64,
}

impl PanelConnection {
    /// Create a new connection.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Send a raw channel frame to the panel.
    ///
    /// Returns `false` if the channel is full or closed, and increments the
    /// dropped frame counter.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Encode a channel event and send it.
    ///
    /// Returns `false` if encoding failed or the frame was dropped.
    pub fn send_event(&self, event: ChannelEvent, args: Option<&Value>) -> bool {
        match encode(event, args) {
            Some(frame) => self.send(Arc::new(frame)),
            None => false,
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
