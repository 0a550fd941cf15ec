//! # Cancellable Timers
//!
//! Click classification and learn timeouts need one-shot callbacks that can
//! be cancelled before they fire. A [`TimerHandle`] invalidates its callback
//! on [`cancel`](TimerHandle::cancel); a cancelled callback never runs.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// One-shot callback
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Schedules cancellable one-shot callbacks
pub trait ClickTimer {
    /// Run `callback` once after `delay`, unless cancelled first
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Handle to a scheduled callback
#[derive(Debug)]
pub struct TimerHandle {
    state: Arc<AtomicU8>,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Cancel the callback
    ///
    /// Returns `true` if the callback had not run yet and now never will.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        cancelled
    }

    /// True while the callback has neither run nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    /// True once the callback has run
    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }
}

/// [`ClickTimer`] running callbacks on the tokio runtime
///
/// Must be used from within a runtime context.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClickTimer;

impl ClickTimer for TokioClickTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = Arc::clone(&state);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_state
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                callback();
            } else {
                debug!("Timer cancelled before firing");
            }
        });

        TimerHandle {
            state,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn test_timer_fires_once() {
        let (count, callback) = counter();
        let handle = TokioClickTimer.schedule(Duration::from_millis(10), callback);
        assert!(handle.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
        assert!(!handle.is_pending());
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_fires() {
        let (count, callback) = counter();
        let mut handle = TokioClickTimer.schedule(Duration::from_millis(30), callback);

        assert!(handle.cancel());
        assert!(!handle.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!handle.has_fired());
    }

    #[tokio::test]
    async fn test_cancel_after_fire_reports_false() {
        let (count, callback) = counter();
        let mut handle = TokioClickTimer.schedule(Duration::from_millis(1), callback);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
