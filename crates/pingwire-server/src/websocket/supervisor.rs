//! Per-connection liveness supervision.
//!
//! [`LivenessSupervisor::attach`] starts one timer task per connection. On
//! each tick the task probes the connection if it is open, or releases the
//! timer if it is not. The primary release path is
//! [`SupervisionHandle::detach`], called synchronously when the socket
//! reports close; the tick-side check covers transports that never deliver
//! a close notification.
//!
//! Probes are fire-and-forget: a Pong is never correlated with a probe and a
//! silent peer is never torn down here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use pingwire_core::{ConnectionId, constants};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::transport::{Connection, ConnectionState};
use crate::errors::SupervisorError;

/// Supervision state for one connection. `Detached` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Timer running.
    Attached,
    /// Timer cancelled.
    Detached,
}

/// Why a probe loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachReason {
    /// [`SupervisionHandle::detach`] was called (explicit close).
    Cancelled,
    /// A tick observed the connection was no longer open.
    ConnectionClosed,
}

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Starts probe timers for accepted connections.
#[derive(Debug, Clone)]
pub struct LivenessSupervisor {
    period: Duration,
}

impl LivenessSupervisor {
    /// Create a supervisor that probes every `period`.
    ///
    /// A zero period is raised to one millisecond.
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
        }
    }

    /// Probe period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Begin supervising `connection`.
    ///
    /// The first probe is due one full period after this call. Fails if the
    /// connection is already closed. Must be called inside a tokio runtime.
    pub fn attach(
        &self,
        connection: Arc<dyn Connection>,
    ) -> Result<SupervisionHandle, SupervisorError> {
        if connection.state() != ConnectionState::Open {
            return Err(SupervisorError::NotOpen(connection.id().clone()));
        }

        let conn_id = connection.id().clone();
        let shared = Arc::new(Shared::default());
        let first_tick = Instant::now() + self.period;
        let task = tokio::spawn(run_probe_loop(
            connection,
            first_tick,
            self.period,
            shared.clone(),
        ));

        debug!(
            conn_id = %conn_id,
            period_ms = self.period.as_millis() as u64,
            "liveness supervisor attached"
        );
        Ok(SupervisionHandle {
            conn_id,
            shared,
            task: Some(task),
        })
    }
}

impl Default for LivenessSupervisor {
    fn default() -> Self {
        Self::new(constants::DEFAULT_PROBE_INTERVAL)
    }
}

#[derive(Default)]
struct Shared {
    token: CancellationToken,
    // Held by detach and around each liveness send.
    send_lock: Mutex<()>,
    detached: AtomicBool,
    cancellations: AtomicU32,
    probes_sent: AtomicU64,
}

impl Shared {
    fn detach(&self) -> bool {
        let _guard = self.send_lock.lock();
        if self.detached.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.cancellations.fetch_add(1, Ordering::AcqRel);
        self.token.cancel();
        true
    }
}

/// Exclusive owner of one connection's probe timer.
///
/// Dropping the handle detaches.
pub struct SupervisionHandle {
    conn_id: ConnectionId,
    shared: Arc<Shared>,
    task: Option<JoinHandle<DetachReason>>,
}

impl SupervisionHandle {
    /// Cancel the timer now.
    ///
    /// Safe to call any number of times; returns `true` only for the call
    /// that cancelled it. No probe is sent after this returns.
    pub fn detach(&self) -> bool {
        let cancelled = self.shared.detach();
        if cancelled {
            debug!(conn_id = %self.conn_id, "liveness supervisor detached");
        }
        cancelled
    }

    /// Current supervision state.
    pub fn state(&self) -> SupervisorState {
        if self.shared.detached.load(Ordering::Acquire) {
            SupervisorState::Detached
        } else {
            SupervisorState::Attached
        }
    }

    /// Whether the timer is still running.
    pub fn is_attached(&self) -> bool {
        self.state() == SupervisorState::Attached
    }

    /// Probes successfully queued so far.
    pub fn probes_sent(&self) -> u64 {
        self.shared.probes_sent.load(Ordering::Acquire)
    }

    /// Number of times the timer was cancelled (0 or 1).
    pub fn cancellations(&self) -> u32 {
        self.shared.cancellations.load(Ordering::Acquire)
    }

    /// The supervised connection.
    pub fn connection_id(&self) -> &ConnectionId {
        &self.conn_id
    }

    /// Wait for the probe loop to end.
    ///
    /// Returns `None` if the task panicked or was aborted.
    pub async fn join(mut self) -> Option<DetachReason> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for SupervisionHandle {
    fn drop(&mut self) {
        let _ = self.shared.detach();
    }
}

async fn run_probe_loop(
    connection: Arc<dyn Connection>,
    first_tick: Instant,
    period: Duration,
    shared: Arc<Shared>,
) -> DetachReason {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shared.token.cancelled() => return DetachReason::Cancelled,
            _ = ticker.tick() => {
                if shared.token.is_cancelled() {
                    return DetachReason::Cancelled;
                }
                match connection.state() {
                    ConnectionState::Open => {
                        let _guard = shared.send_lock.lock();
                        if shared.detached.load(Ordering::Acquire) {
                            return DetachReason::Cancelled;
                        }
                        probe(connection.as_ref(), &shared);
                    }
                    ConnectionState::Closed => {
                        let _ = shared.detach();
                        debug!(
                            conn_id = %connection.id(),
                            "connection no longer open, liveness timer released"
                        );
                        return DetachReason::ConnectionClosed;
                    }
                }
            }
        }
    }
}

fn probe(connection: &dyn Connection, shared: &Shared) {
    match connection.send_probe() {
        Ok(()) => {
            let sent = shared.probes_sent.fetch_add(1, Ordering::AcqRel) + 1;
            counter!("ws_probes_sent_total").increment(1);
            debug!(conn_id = %connection.id(), probes_sent = sent, "liveness probe sent");
        }
        // Not retried; the close notification drives cleanup.
        Err(e) => {
            counter!("ws_probe_failures_total").increment(1);
            warn!(conn_id = %connection.id(), error = %e, "liveness probe failed");
        }
    }
}
