//! threadpool.rs

mod common;

use common::Gauge;
use mockall::mock;
use osal_core::error::OsError;
use osal_core::runnable::UncaughtErrorHandler;
use osal_core::thread::Thread;
use osal_core::threadpool::{ThreadPool, WaitGuard};
use osal_core::timeout::Timeout;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

mock! {
    Handler {}
    impl UncaughtErrorHandler for Handler {
        fn handle(&self, thread_name: &str, message: &str);
    }
}

fn counting_task(count: &Arc<AtomicUsize>) -> Arc<dyn osal_core::Runnable> {
    let count = Arc::clone(count);
    Arc::new(move || {
        count.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn start_without_waiter_runs_the_task() {
    common::init();
    let pool = ThreadPool::create(2).unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    pool.start(counting_task(&count), None, Thread::INHERIT_PRIORITY)
        .unwrap();
    drop(pool); // waits for the task
    assert_eq!(1, count.load(Ordering::SeqCst));
}

#[test]
fn waiter_observes_completion_and_release_invalidates() {
    common::init();
    let pool = ThreadPool::create(2).unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    let mut guard = WaitGuard::new();
    pool.start(counting_task(&count), Some(&mut guard), Thread::INHERIT_PRIORITY)
        .unwrap();
    assert!(guard.is_valid());

    assert_eq!(Ok(()), guard.wait());
    assert_eq!(1, count.load(Ordering::SeqCst));

    guard.release();
    assert!(!guard.is_valid());
    guard.release(); // idempotent
}

#[test]
fn dropping_a_valid_guard_releases_it() {
    common::init();
    let pool = ThreadPool::create(1).unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    {
        let mut guard = WaitGuard::new();
        pool.start(counting_task(&count), Some(&mut guard), Thread::INHERIT_PRIORITY)
            .unwrap();
    }
    // The runner went back to the free queue, so the single worker can be
    // dispatched again without blocking.
    assert_eq!(
        Ok(()),
        pool.try_start(counting_task(&count), None, Thread::INHERIT_PRIORITY)
    );
    drop(pool);
    assert_eq!(2, count.load(Ordering::SeqCst));
}

#[test]
fn try_wait_and_timed_wait_on_a_busy_task() {
    common::init();
    let pool = ThreadPool::create(1).unwrap();

    let mut guard = WaitGuard::new();
    pool.start(
        Arc::new(|| Thread::sleep(200)),
        Some(&mut guard),
        Thread::INHERIT_PRIORITY,
    )
    .unwrap();

    assert_eq!(Err(OsError::TimedOut), guard.try_wait());
    assert_eq!(Err(OsError::TimedOut), guard.timed_wait(Timeout::Millis(20)));
    assert_eq!(Ok(()), guard.wait());
    guard.release();
}

#[test]
fn a_bound_guard_cannot_be_bound_again() {
    common::init();
    let pool = ThreadPool::create(2).unwrap();

    let mut guard = WaitGuard::new();
    pool.start(Arc::new(|| {}), Some(&mut guard), Thread::INHERIT_PRIORITY)
        .unwrap();
    assert_eq!(
        Err(OsError::InvalidParameter),
        pool.start(Arc::new(|| {}), Some(&mut guard), Thread::INHERIT_PRIORITY)
    );
    guard.release();
}

// A held guard pins its runner, so never keep more guards outstanding than
// the pool has workers: size the pool to the whole batch here.
#[test]
fn multiple_waiters_complete_independently() {
    common::init();
    let pool = ThreadPool::create(8).unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    let mut guards = Vec::new();
    for _ in 0..8 {
        let mut guard = WaitGuard::new();
        pool.start(counting_task(&count), Some(&mut guard), Thread::INHERIT_PRIORITY)
            .unwrap();
        guards.push(guard);
    }
    for guard in &mut guards {
        assert_eq!(Ok(()), guard.wait());
        guard.release();
    }
    assert_eq!(8, count.load(Ordering::SeqCst));
}

// Submit far more work than the pool can hold: backpressure must surface as
// TimedOut on tryStart, and every accepted task must still run.
#[test]
fn backpressure_on_a_saturated_pool() {
    common::init();
    let pool = ThreadPool::create_with(10, 0, Thread::normal_priority(), "burst").unwrap();
    let executed = Arc::new(AtomicUsize::new(0));

    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..100 {
        let executed = Arc::clone(&executed);
        let task = Arc::new(move || {
            Thread::sleep(20);
            executed.fetch_add(1, Ordering::SeqCst);
        });
        match pool.try_start(task, None, Thread::INHERIT_PRIORITY) {
            Ok(()) => accepted += 1,
            Err(OsError::TimedOut) => rejected += 1,
            Err(other) => panic!("unexpected dispatch error: {other:?}"),
        }
    }
    assert!(rejected >= 1, "a 10-worker pool absorbed 100 instant submissions");
    assert_eq!(100, accepted + rejected);

    drop(pool); // waits for everything accepted
    assert_eq!(accepted, executed.load(Ordering::SeqCst));
}

// No guards here: self-releasing runners are the recycling path, and a
// blocking start simply rides the free queue once all workers are busy.
#[test]
fn concurrency_never_exceeds_the_worker_count() {
    common::init();
    let pool = ThreadPool::create(3).unwrap();
    let gauge = Arc::new(Gauge::default());

    for _ in 0..12 {
        let gauge = Arc::clone(&gauge);
        let task = Arc::new(move || {
            gauge.enter();
            Thread::sleep(15);
            gauge.leave();
        });
        pool.start(task, None, Thread::INHERIT_PRIORITY).unwrap();
    }
    drop(pool); // waits for every dispatched task
    assert!(gauge.peak() <= 3, "peak concurrency {}", gauge.peak());
    assert_eq!(0, gauge.current());
}

#[test]
fn uncaught_task_failure_is_reported_and_the_worker_survives() {
    common::init();
    let pool = ThreadPool::create_with(1, 0, Thread::normal_priority(), "careful").unwrap();

    let mut handler = MockHandler::new();
    handler
        .expect_handle()
        .withf(|name, message| name == "careful" && message.contains("task blew up"))
        .times(1)
        .return_const(());
    pool.set_uncaught_error_handler(Some(Arc::new(handler)));
    assert!(pool.uncaught_error_handler().is_some());

    let mut guard = WaitGuard::new();
    pool.start(
        Arc::new(|| panic!("task blew up")),
        Some(&mut guard),
        Thread::INHERIT_PRIORITY,
    )
    .unwrap();
    guard.release();

    // The worker went back to idle and serves the next task.
    let count = Arc::new(AtomicUsize::new(0));
    let mut second = WaitGuard::new();
    pool.start(counting_task(&count), Some(&mut second), Thread::INHERIT_PRIORITY)
        .unwrap();
    second.release();
    assert_eq!(1, count.load(Ordering::SeqCst));
}

#[test]
fn dispatch_priority_is_applied_and_inherit_resolves_to_normal() {
    common::init();
    let pool = ThreadPool::create_with(1, 0, Thread::normal_priority(), "prio").unwrap();
    let seen = Arc::new(AtomicI32::new(i32::MIN));

    let observer = |seen: &Arc<AtomicI32>| {
        let seen = Arc::clone(seen);
        Arc::new(move || {
            if let Some(current) = Thread::current() {
                seen.store(current.priority(), Ordering::SeqCst);
            }
        })
    };

    let mut guard = WaitGuard::new();
    pool.start(observer(&seen), Some(&mut guard), 7).unwrap();
    guard.release();
    assert_eq!(7, seen.load(Ordering::SeqCst));

    // From a non-layer thread, INHERIT falls back to the normal priority.
    let mut guard = WaitGuard::new();
    pool.start(observer(&seen), Some(&mut guard), Thread::INHERIT_PRIORITY)
        .unwrap();
    guard.release();
    assert_eq!(Thread::normal_priority(), seen.load(Ordering::SeqCst));
}

#[test]
fn workers_carry_the_pool_thread_name() {
    common::init();
    let pool = ThreadPool::create_with(1, 0, Thread::normal_priority(), "crew").unwrap();
    assert_eq!("crew", pool.thread_name());

    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let task = {
        let seen = Arc::clone(&seen);
        Arc::new(move || {
            if let Some(current) = Thread::current() {
                *seen.lock().unwrap() = current.name();
            }
        })
    };
    let mut guard = WaitGuard::new();
    pool.start(task, Some(&mut guard), Thread::INHERIT_PRIORITY)
        .unwrap();
    guard.release();
    assert_eq!("crew", *seen.lock().unwrap());
}

#[test]
fn destroy_waits_for_in_flight_tasks() {
    common::init();
    let pool = ThreadPool::create(2).unwrap();
    let count = Arc::new(AtomicUsize::new(0));

    for _ in 0..4 {
        let count = Arc::clone(&count);
        pool.start(
            Arc::new(move || {
                Thread::sleep(40);
                count.fetch_add(1, Ordering::SeqCst);
            }),
            None,
            Thread::INHERIT_PRIORITY,
        )
        .unwrap();
    }
    drop(pool);
    assert_eq!(4, count.load(Ordering::SeqCst));
}
