use tokio::task::JoinHandle;

/// Handle over a single live feed, wrapping its teardown function.
///
/// Closing is idempotent and also happens on drop, so every feed is released
/// exactly once on every exit path.
pub struct FeedHandle {
    teardown: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl FeedHandle {
    /// Wrap an arbitrary teardown function.
    pub fn new(teardown: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Handle whose feed is driven by a spawned forwarder task; closing the
    /// handle aborts the task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    /// Invoke the teardown. Subsequent calls are no-ops.
    pub fn close(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("closed", &self.teardown.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn close_runs_teardown_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut handle = FeedHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        handle.close();
        handle.close();
        drop(handle);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_without_close_still_tears_down() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        drop(FeedHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
