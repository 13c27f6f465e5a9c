//! Tests for the debounce module

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder() -> (Arc<AtomicUsize>, Arc<Mutex<Vec<u32>>>) {
    (Arc::new(AtomicUsize::new(0)), Arc::new(Mutex::new(Vec::new())))
}

fn recording_debouncer(
    delay: Duration,
    calls: &Arc<AtomicUsize>,
    seen: &Arc<Mutex<Vec<u32>>>,
) -> Debouncer<u32> {
    let calls = Arc::clone(calls);
    let seen = Arc::clone(seen);
    debounce(
        move |value: u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(value);
        },
        delay,
    )
}

// ============================================================================
// TokioScheduler Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduler_runs_after_delay() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let _handle = TokioScheduler.schedule_once(
        Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
        Duration::from_millis(100),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_cancel() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let handle = TokioScheduler.schedule_once(
        Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }),
        Duration::from_millis(100),
    );
    handle.cancel();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn test_noop_handle_cancel() {
    TimerHandle::noop().cancel();
}

// ============================================================================
// Debouncer Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_debounce_collapses_burst_to_last_args() {
    let (calls, seen) = recorder();
    let delay = Duration::from_millis(300);
    let debouncer = recording_debouncer(delay, &calls, &seen);

    debouncer.call(1);
    tokio::time::sleep(delay / 4).await;
    debouncer.call(2);
    tokio::time::sleep(delay / 4).await;
    debouncer.call(3);
    assert!(debouncer.is_pending());

    tokio::time::sleep(delay * 2).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![3]);
    assert!(!debouncer.is_pending());
}

#[tokio::test(start_paused = true)]
async fn test_debounce_separate_quiet_periods() {
    let (calls, seen) = recorder();
    let delay = Duration::from_millis(100);
    let debouncer = recording_debouncer(delay, &calls, &seen);

    debouncer.call(1);
    tokio::time::sleep(delay * 2).await;
    debouncer.call(2);
    tokio::time::sleep(delay * 2).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_waits_for_quiet_period() {
    let (calls, seen) = recorder();
    let delay = Duration::from_millis(100);
    let debouncer = recording_debouncer(delay, &calls, &seen);

    // Calls keep arriving inside the window, so nothing fires yet
    for value in 0..10 {
        debouncer.call(value);
        tokio::time::sleep(delay / 2).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(delay).await;
    assert_eq!(*seen.lock().unwrap(), vec![9]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_cancel() {
    let (calls, seen) = recorder();
    let debouncer = recording_debouncer(Duration::from_millis(100), &calls, &seen);

    debouncer.call(1);
    debouncer.cancel();
    assert!(!debouncer.is_pending());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_drop_cancels_pending() {
    let (calls, seen) = recorder();
    let debouncer = recording_debouncer(Duration::from_millis(100), &calls, &seen);

    debouncer.call(1);
    drop(debouncer);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Scheduler that only runs tasks when told to
#[derive(Default)]
struct ManualScheduler {
    tasks: Mutex<Vec<(Task, Arc<AtomicUsize>)>>,
}

impl ManualScheduler {
    fn run_all(&self) -> usize {
        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        let mut ran = 0;
        for (task, cancelled) in tasks {
            if cancelled.load(Ordering::SeqCst) == 0 {
                task();
                ran += 1;
            }
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, task: Task, _delay: Duration) -> TimerHandle {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&cancelled);
        self.tasks.lock().unwrap().push((task, cancelled));
        TimerHandle::new(move || {
            flag.store(1, Ordering::SeqCst);
        })
    }
}

#[test]
fn test_debounce_with_custom_scheduler() {
    let scheduler = Arc::new(ManualScheduler::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let debouncer = Debouncer::with_scheduler(
        move |value: &'static str| s.lock().unwrap().push(value),
        Duration::from_millis(300),
        scheduler.clone(),
    );

    debouncer.call("a");
    debouncer.call("ab");
    debouncer.call("abc");

    assert_eq!(scheduler.run_all(), 1);
    assert_eq!(*seen.lock().unwrap(), vec!["abc"]);
    assert!(!debouncer.is_pending());
    assert_eq!(debouncer.delay(), Duration::from_millis(300));
}

/// Scheduler that runs every task before returning
struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule_once(&self, task: Task, _delay: Duration) -> TimerHandle {
        task();
        TimerHandle::noop()
    }
}

#[test]
fn test_debounce_with_inline_scheduler() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let debouncer = Debouncer::with_scheduler(
        move |value: u32| s.lock().unwrap().push(value),
        Duration::ZERO,
        Arc::new(InlineScheduler),
    );

    debouncer.call(1);
    debouncer.call(2);

    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    assert!(!debouncer.is_pending());
}
