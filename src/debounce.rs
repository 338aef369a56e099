//! Input debouncing
//!
//! The raw search text changes on every keystroke; the debounced value only
//! follows it once the text has been left alone for the configured delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default quiet period before an input is propagated
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Delays a string value until it has been stable for `delay`.
///
/// Each call to [`Debouncer::input`] aborts the pending timer and arms a new
/// one. Dropping the debouncer aborts the pending timer too, so nothing is
/// published after teardown. Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    tx: Arc<watch::Sender<String>>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create a debouncer whose settled value starts at `initial`
    pub fn new(initial: impl Into<String>, delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(initial.into());
        Self {
            delay,
            tx: Arc::new(tx),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Receiver of settled values; `changed()` fires once per new value
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }

    /// Current settled value
    pub fn value(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Whether a timer is armed and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Feed a new raw value, restarting the wait
    pub fn input(&mut self, value: impl Into<String>) {
        self.cancel();

        let value = value.into();
        let tx = Arc::clone(&self.tx);
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tx.send_if_modified(|current| {
                if *current == value {
                    false
                } else {
                    tracing::debug!(term = %value, "input settled");
                    *current = value;
                    true
                }
            });
        }));
    }

    /// Drop the pending value, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
