//! Debounce module
//!
//! Cancellable one-shot timers and the debouncer built on them.
//!
//! # Overview
//!
//! - `Scheduler` / `TokioScheduler` - `schedule_once(task, delay) -> TimerHandle`
//! - `Debouncer` - collapses bursts of calls into one trailing invocation

mod debouncer;
mod scheduler;

pub use debouncer::{debounce, Debouncer};
pub use scheduler::{Scheduler, Task, TimerHandle, TokioScheduler};

#[cfg(test)]
mod tests;
