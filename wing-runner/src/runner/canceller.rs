// Copyright (c) The wing-commander Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Notify;

/// A handle for cancelling an in-progress test run.
///
/// Clones share state: cancelling one cancels all of them. Once cancelled, a canceller stays
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct RunCanceller {
    inner: Arc<CancellerInner>,
}

#[derive(Debug, Default)]
struct CancellerInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl RunCanceller {
    /// Creates a new, uncancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    ///
    /// If a test command is running, it is killed and the run is recorded as cancelled. If the
    /// command has already exited, this has no effect on the current run.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once cancellation is requested.
    pub async fn cancelled(&self) {
        // Register before checking the flag, so a concurrent cancel() is never missed.
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime created")
    }

    #[test]
    fn clones_share_state() {
        let canceller = RunCanceller::new();
        let clone = canceller.clone();
        assert!(!clone.is_cancelled());
        canceller.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancelled_resolves_if_already_cancelled() {
        let canceller = RunCanceller::new();
        canceller.cancel();
        runtime().block_on(async {
            tokio::time::timeout(Duration::from_secs(5), canceller.cancelled())
                .await
                .expect("cancelled() resolves immediately");
        });
    }

    #[test]
    fn cancelled_wakes_up_from_another_thread() {
        let canceller = RunCanceller::new();
        let handle = {
            let canceller = canceller.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(50));
                canceller.cancel();
            })
        };
        runtime().block_on(async {
            tokio::time::timeout(Duration::from_secs(30), canceller.cancelled())
                .await
                .expect("cancelled() resolves after cancel()");
        });
        handle.join().expect("thread exited");
    }
}
