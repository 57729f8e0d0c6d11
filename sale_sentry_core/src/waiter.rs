// Cancellable delay used to pace upstream calls
use log::debug;
use std::time::Duration;
use tokio::sync::watch;

/// Sender half of the stop signal. `stop()` wakes every waiter.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        // send_replace succeeds even with no receivers left
        self.tx.send_replace(true);
    }
}

/// Sleeps between network calls unless the stop signal fires first.
#[derive(Debug, Clone)]
pub struct Waiter {
    stop_rx: watch::Receiver<bool>,
}

impl Waiter {
    /// New waiter plus the handle that cancels it.
    pub fn new() -> (Self, StopHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { stop_rx: rx }, StopHandle { tx })
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Wait `ms` milliseconds. Returns `false` if stopped before or during
    /// the wait.
    pub async fn wait(&mut self, ms: u64) -> bool {
        if self.is_stopped() {
            return false;
        }
        if ms == 0 {
            return true;
        }
        debug!("Sleeping for {} ms", ms);
        let mut stop_rx = self.stop_rx.clone();
        // A dropped StopHandle never fires; the sleep branch still completes.
        let stopped = async move { stop_rx.wait_for(|stopped| *stopped).await.is_ok() };
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(ms)) => !self.is_stopped(),
            true = stopped => false,
        }
    }
}
