use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::Input;

/// Cancellable deferred check for a missing agent response, keyed by the
/// transcript sequence that armed it so a superseded timer can never fire
/// observably.
#[derive(Debug, Default)]
pub(crate) struct Watchdog {
    armed: Option<(u64, JoinHandle<()>)>,
}

impl Watchdog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arm for `seq`, replacing any pending watchdog.
    pub(crate) fn arm(&mut self, seq: u64, window: Duration, tx: mpsc::Sender<Input>) {
        self.disarm();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(Input::WatchdogFired(seq)).await;
        });
        self.armed = Some((seq, handle));
    }

    pub(crate) fn disarm(&mut self) {
        if let Some((_, handle)) = self.armed.take() {
            handle.abort();
        }
    }

    /// Consume a firing. True only when `seq` is the watchdog currently
    /// armed; anything else is stale and ignored.
    pub(crate) fn expire(&mut self, seq: u64) -> bool {
        match self.armed.take() {
            Some((armed_seq, _)) if armed_seq == seq => true,
            other => {
                self.armed = other;
                false
            }
        }
    }
}
