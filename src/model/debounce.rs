//! Caller-side debouncing for search-as-you-type

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Restarts a timer on every trigger; only the last action scheduled within
/// `delay` of quiet actually runs.
pub struct SearchDebouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn trigger<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take() {
            previous.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn only_last_trigger_fires() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(500));
        let fired = Arc::new(Mutex::new(Vec::new()));

        for query in ["b", "be", "bea"] {
            let fired = fired.clone();
            debouncer.trigger(async move { fired.lock().unwrap().push(query) });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        assert_eq!(*fired.lock().unwrap(), vec!["bea"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(500));
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        debouncer.trigger(async move { *flag.lock().unwrap() = true });
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!*fired.lock().unwrap());
    }
}
