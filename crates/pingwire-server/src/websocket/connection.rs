//! `WebSocket` client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pingwire_core::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::transport::{Connection, ConnectionState};
use crate::errors::TransportError;

/// A frame queued for the socket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame.
    Text(Arc<String>),
    /// A zero-payload Ping frame.
    Probe,
}

/// An accepted `WebSocket` client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Send channel to the socket write task.
    tx: mpsc::Sender<Outbound>,
    open: AtomicBool,
    /// When this connection was established.
    pub connected_at: Instant,
    /// When the last Pong was received.
    last_pong: Mutex<Option<Instant>>,
    /// Count of frames that could not be queued.
    pub dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Create a new open connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            tx,
            open: AtomicBool::new(true),
            connected_at: Instant::now(),
            last_pong: Mutex::new(None),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Transition to `Closed`.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn mark_closed(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }

    /// Record a Pong from the peer.
    pub fn mark_pong(&self) {
        *self.last_pong.lock() = Some(Instant::now());
    }

    /// Time since the last Pong, if one was ever received.
    pub fn last_pong_elapsed(&self) -> Option<Duration> {
        self.last_pong.lock().map(|at| at.elapsed())
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    fn enqueue(&self, frame: Outbound) -> Result<(), TransportError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(err) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                match err {
                    TrySendError::Full(_) => Err(TransportError::QueueFull),
                    TrySendError::Closed(_) => Err(TransportError::Closed),
                }
            }
        }
    }
}

impl Connection for ClientConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn state(&self) -> ConnectionState {
        if self.open.load(Ordering::Acquire) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn send(&self, payload: Arc<String>) -> Result<(), TransportError> {
        self.enqueue(Outbound::Text(payload))
    }

    fn send_probe(&self) -> Result<(), TransportError> {
        self.enqueue(Outbound::Probe)
    }
}
