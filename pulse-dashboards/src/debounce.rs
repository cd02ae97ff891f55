//! Debounce window for user-driven filter changes.
//!
//! Rapid UI interaction must not spawn a cascade of overlapping fetch cycles:
//! each call reschedules the action, and only the last invocation inside the
//! window fires. The aborted task is the cancellation unit.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Default debounce window for filter changes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Schedule `action` to run after the window, cancelling any previously
    /// scheduled action.
    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        let window = self.window;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action.await;
        }));
    }

    /// Drop any scheduled action without running it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_collapse_to_last() {
        let fired: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::default();

        for symbol in ["BTC", "ETH", "SOL"] {
            let fired = Arc::clone(&fired);
            debouncer.call(async move {
                fired.lock().push(symbol);
            });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tokio::time::sleep(DEFAULT_DEBOUNCE).await;
        tokio::task::yield_now().await;

        // Three changes within the window fire exactly once, with the last value.
        assert_eq!(*fired.lock(), vec!["SOL"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_fire() {
        let fired: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::default();

        for symbol in ["BTC", "ETH"] {
            let fired = Arc::clone(&fired);
            debouncer.call(async move {
                fired.lock().push(symbol);
            });
            tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        }
        tokio::task::yield_now().await;

        assert_eq!(*fired.lock(), vec!["BTC", "ETH"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_action() {
        let fired: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::default();

        {
            let fired = Arc::clone(&fired);
            debouncer.call(async move {
                fired.lock().push("BTC");
            });
        }
        debouncer.cancel();

        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert!(fired.lock().is_empty());
    }
}
