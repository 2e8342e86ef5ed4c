use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Buffer size for the tick channel.
/// Ticks are idempotent, so a small buffer that drops extras is enough.
pub const TICK_CHANNEL_SIZE: usize = 4;

/// One expiry-check request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Background task emitting a [`Tick`] every period, starting immediately.
///
/// The task only signals; the owner of the session state does the checking
/// on its own loop. Stopping or dropping the handle aborts the task, so no
/// tick is produced after teardown.
pub struct PollTimer {
    handle: JoinHandle<()>,
}

impl PollTimer {
    /// Spawn on the current tokio runtime.
    pub fn start(period: Duration, tx: mpsc::Sender<Tick>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match tx.try_send(Tick) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("Previous ticks still pending, coalescing");
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Tick receiver dropped, stopping poll timer");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// Convenience: a timer together with its receiving end.
    pub fn channel(period: Duration) -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(TICK_CHANNEL_SIZE);
        (Self::start(period, tx), rx)
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        // Drop aborts
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
