//! Server-wide shutdown signal.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One token observed by the serve task and every socket session.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Signal shutdown without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Signal shutdown, then give `task` up to `timeout` to finish.
    ///
    /// Aborts the task on timeout. Returns whether it finished in time.
    pub async fn drain(&self, task: JoinHandle<()>, timeout: Duration) -> bool {
        self.shutdown();
        let abort = task.abort_handle();

        if tokio::time::timeout(timeout, task).await.is_ok() {
            info!("serve task drained");
            true
        } else {
            warn!(?timeout, "serve task did not drain in time, aborting");
            abort.abort();
            false
        }
    }
}
