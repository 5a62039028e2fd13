//! Debounce timers.
//!
//! Every line owns at most one pending timer. Starting a timer aborts the
//! previous one; a timer whose body has already started is left to finish and
//! its result is discarded by the revision check in the proof.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{self, AbortHandle};
use tokio::time;

/// Quiet period after the last edit before a line verifies itself.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Where debounce timers run.
///
/// A disabled scheduler never fires; lines are then verified only on
/// request, which is what batch tools and most tests want.
#[derive(Clone, Default)]
pub struct DebounceScheduler {
    handle: Option<Handle>,
    runtime: Option<Arc<Runtime>>,
}

impl DebounceScheduler {
    /// A scheduler with its own single-worker runtime.
    pub fn runtime() -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("deduct-debounce")
            .enable_time()
            .build()?;
        Ok(Self {
            handle: Some(runtime.handle().clone()),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Runs timers on a runtime owned by the host application.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
            runtime: None,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn handle(&self) -> Option<Handle> {
        self.handle.clone()
    }
}

impl fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("enabled", &self.is_enabled())
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

/// Runs `job` on the blocking pool once `delay` has passed.
pub(crate) fn start_timer(
    handle: &Handle,
    delay: Duration,
    job: impl FnOnce() + Send + 'static,
) -> AbortHandle {
    handle
        .spawn(async move {
            time::sleep(delay).await;
            if let Err(err) = task::spawn_blocking(job).await {
                tracing::warn!("debounced verification failed: {err}");
            }
        })
        .abort_handle()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn aborted_timer_never_fires() {
        let scheduler = DebounceScheduler::runtime().unwrap();
        let handle = scheduler.handle().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        let first = {
            let fired = fired.clone();
            start_timer(&handle, Duration::from_millis(50), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };
        first.abort();
        {
            let fired = fired.clone();
            start_timer(&handle, Duration::from_millis(50), move || {
                fired.fetch_add(10, Ordering::SeqCst);
            });
        }

        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn disabled_scheduler_has_no_handle() {
        assert!(!DebounceScheduler::disabled().is_enabled());
        assert!(DebounceScheduler::disabled().handle().is_none());
    }
}
