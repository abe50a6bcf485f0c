use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Opens once; every worker waits on it so all of them start on the same clock.
#[derive(Debug, Default)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        loop {
            // Register interest before checking the flag so a concurrent `start` is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.started.load(Ordering::Acquire) {
                return;
            }
            notified.await;
        }
    }
}
