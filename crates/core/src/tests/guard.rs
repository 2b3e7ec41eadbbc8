use crate::error::OsError;
use crate::threadpool::{ThreadPool, WaitGuard};
use crate::timeout::Timeout;
use crate::timer::PeriodicTimer;
use std::sync::Arc;

#[test]
fn default_wait_guard_is_invalid_and_vacuous() {
    let guard = WaitGuard::new();
    assert!(!guard.is_valid());
    assert_eq!(Ok(()), guard.wait());
    assert_eq!(Ok(()), guard.try_wait());
    assert_eq!(Ok(()), guard.timed_wait(Timeout::Millis(10)));
}

#[test]
fn release_on_invalid_guard_is_a_no_op() {
    let mut guard = WaitGuard::default();
    guard.release();
    guard.release();
    assert!(!guard.is_valid());
}

#[test]
fn zero_worker_pool_is_rejected() {
    assert!(ThreadPool::create(0).is_none());
}

#[test]
fn zero_period_timer_is_rejected() {
    let task = Arc::new(|| {});
    assert!(PeriodicTimer::create(task, 0, "tick").is_none());
}

#[test]
fn error_messages() {
    assert_eq!("timed out", OsError::TimedOut.to_string());
    assert_eq!("not locked by caller", OsError::NotLocked.to_string());
    assert_eq!(
        "backend failure => queue backing flags",
        OsError::Other("queue backing flags").to_string()
    );
}
