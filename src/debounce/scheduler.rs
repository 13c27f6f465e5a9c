//! Cancellable one-shot timers

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Boxed callback run by a scheduler
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    /// Wrap a cancel action
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle whose cancellation does nothing
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Cancel the task if it has not run yet
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl From<AbortHandle> for TimerHandle {
    fn from(handle: AbortHandle) -> Self {
        Self::new(move || handle.abort())
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Runs a task once after a delay
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run after `delay`
    fn schedule_once(&self, task: Task, delay: Duration) -> TimerHandle;
}

/// Scheduler backed by the tokio timer
///
/// Must be used from within a tokio runtime. Tests can drive it with
/// paused time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, task: Task, delay: Duration) -> TimerHandle {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        handle.abort_handle().into()
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule_once(&self, task: Task, delay: Duration) -> TimerHandle {
        (**self).schedule_once(task, delay)
    }
}
