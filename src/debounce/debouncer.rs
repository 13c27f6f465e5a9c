//! Debounced callbacks
//!
//! Each `call` cancels the pending invocation and reschedules it with the
//! newest arguments, so a burst yields one invocation with the last args.

use super::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Delays a callback until calls stop arriving for `delay`
pub struct Debouncer<A> {
    callback: Callback<A>,
    delay: Duration,
    scheduler: Arc<dyn Scheduler>,
    state: Arc<Mutex<PendingState>>,
}

#[derive(Debug, Default)]
struct PendingState {
    handle: Option<TimerHandle>,
    // Bumped on every call; a timer only fires if its generation is current
    generation: u64,
    // Generation of the last timer that fired
    fired: u64,
}

impl<A: Send + 'static> Debouncer<A> {
    /// Create a debouncer on the tokio timer
    pub fn new(callback: impl Fn(A) + Send + Sync + 'static, delay: Duration) -> Self {
        Self::with_scheduler(callback, delay, Arc::new(TokioScheduler))
    }

    /// Create a debouncer on a custom scheduler
    pub fn with_scheduler(
        callback: impl Fn(A) + Send + Sync + 'static,
        delay: Duration,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            callback: Arc::new(callback),
            delay,
            scheduler,
            state: Arc::new(Mutex::new(PendingState::default())),
        }
    }

    /// Schedule the callback with `args`, replacing any pending call.
    ///
    /// The lock is released while the scheduler runs, so a scheduler may
    /// run the task inline.
    pub fn call(&self, args: A) {
        let generation = {
            let mut state = self.lock();
            if let Some(handle) = state.handle.take() {
                handle.cancel();
            }
            state.generation += 1;
            state.generation
        };

        let callback = Arc::clone(&self.callback);
        let shared = Arc::clone(&self.state);
        let task = Box::new(move || {
            {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if state.generation != generation {
                    return;
                }
                state.handle = None;
                state.fired = generation;
            }
            callback(args);
        });

        let handle = self.scheduler.schedule_once(task, self.delay);

        // Keep the handle only if no newer call superseded it and it has not fired
        let mut state = self.lock();
        if state.generation == generation && state.fired != generation {
            state.handle = Some(handle);
        } else {
            drop(state);
            handle.cancel();
        }
    }

    /// Drop any pending call
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(handle) = state.handle.take() {
            handle.cancel();
        }
    }

    /// Check if a call is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.lock().handle.is_some()
    }

    /// Quiet period
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        if let Some(handle) = state.handle.take() {
            handle.cancel();
        }
    }
}

impl<A> fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Convenience wrapper matching `debounce(fn, delay)`
pub fn debounce<A: Send + 'static>(
    callback: impl Fn(A) + Send + Sync + 'static,
    delay: Duration,
) -> Debouncer<A> {
    Debouncer::new(callback, delay)
}
