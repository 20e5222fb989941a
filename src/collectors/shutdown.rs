use std::time::Duration;
use tokio::sync::watch;

/// Sending half of a cooperative stop signal
///
/// Once sent the signal cannot be recalled; a new session creates a new pair.
#[derive(Debug)]
pub struct StopController(watch::Sender<bool>);

/// Receiving half, one clone per background task
#[derive(Debug, Clone)]
pub struct StopSignal(watch::Receiver<bool>);

impl StopController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self(tx)
    }

    pub fn subscribe(&self) -> StopSignal {
        StopSignal(self.0.subscribe())
    }

    /// Tells every subscribed task to exit at its next polling boundary
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Outcome of stopping a set of background tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Tasks that exited within the stop timeout
    pub stopped: usize,
    /// Tasks still running at the deadline, left to finish on their own
    pub detached: usize,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.detached == 0
    }
}

impl Default for StopController {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    /// Non-blocking check. A dropped controller counts as stopped.
    pub fn is_stopped(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Sleeps for `duration` unless stopped first
    ///
    /// Returns `true` when the sleep was cut short by a stop request.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.0.wait_for(|stopped| *stopped) => true,
        }
    }
}
