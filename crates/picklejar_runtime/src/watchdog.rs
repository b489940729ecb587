//! Deadline enforcement for a running parse.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use picklejar_machine::CancelToken;
use tracing::warn;

/// Trips a [`CancelToken`] if it is still alive when the deadline passes.
///
/// Dropping the watchdog disarms it.
pub struct Watchdog {
    disarm: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Arms a watchdog that cancels `token` after `timeout`.
    #[must_use]
    pub fn arm(token: CancelToken, timeout: Duration) -> Self {
        let (disarm, signal) = mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = signal.recv_timeout(timeout) {
                warn!(timeout_ms = timeout.as_millis(), "parse deadline passed, cancelling");
                token.cancel();
            }
        });
        Self {
            disarm: Some(disarm),
            thread: Some(thread),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Closing the channel wakes the thread without cancelling.
        drop(self.disarm.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
