//! eventflag.rs

mod common;

use osal_core::error::OsError;
use osal_core::eventflag::{EventFlag, WaitMode};
use osal_core::thread::Thread;
use osal_core::timeout::Timeout;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn set_accumulates_and_reset_clears_exact_bits() {
    common::init();
    let flag = EventFlag::create(false).unwrap();
    flag.set(0x05).unwrap();
    flag.set(0x0a).unwrap();
    assert_eq!(0x0f, flag.current_pattern());

    flag.reset(0x06).unwrap();
    assert_eq!(0x09, flag.current_pattern());

    flag.reset_all().unwrap();
    assert_eq!(0, flag.current_pattern());
}

#[test]
fn set_one_and_reset_one_address_single_bits() {
    common::init();
    let flag = EventFlag::create(false).unwrap();
    flag.set_one(3).unwrap();
    flag.set_one(0).unwrap();
    assert_eq!(0b1001, flag.current_pattern());
    flag.reset_one(3).unwrap();
    assert_eq!(0b0001, flag.current_pattern());
}

#[test]
fn parameter_validation() {
    common::init();
    let flag = EventFlag::create(false).unwrap();
    assert_eq!(
        Err(OsError::InvalidParameter),
        flag.wait(0, WaitMode::And).map(|_| ())
    );
    let width = EventFlag::PATTERN_BITS;
    assert_eq!(Err(OsError::InvalidParameter), flag.try_wait_one(width).map(|_| ()));
    assert_eq!(Err(OsError::InvalidParameter), flag.set_one(width));
    assert_eq!(Err(OsError::InvalidParameter), flag.reset_one(width));
}

#[test]
fn polling_and_timed_waits_time_out_when_unsatisfied() {
    common::init();
    let flag = EventFlag::create(false).unwrap();
    flag.set(0x01).unwrap();
    assert_eq!(Err(OsError::TimedOut), flag.try_wait(0x02, WaitMode::Or).map(|_| ()));
    assert_eq!(
        Err(OsError::TimedOut),
        flag.timed_wait(0x03, WaitMode::And, Timeout::Millis(30)).map(|_| ())
    );
    // The partial bit is untouched by the failed waits.
    assert_eq!(0x01, flag.current_pattern());
}

#[test]
fn or_wait_succeeds_on_any_matching_bit() {
    common::init();
    let flag = EventFlag::create(false).unwrap();
    flag.set(0x10).unwrap();
    let observed = flag.try_wait(0x30, WaitMode::Or).unwrap();
    assert_eq!(0x10, observed);
}

#[test]
fn auto_reset_consumes_the_whole_pattern() {
    common::init();
    let flag = EventFlag::create(true).unwrap();
    flag.set(0x0c).unwrap();
    let observed = flag.try_wait_any().unwrap();
    assert_eq!(0x0c, observed);
    assert_eq!(0, flag.current_pattern());
    assert_eq!(Err(OsError::TimedOut), flag.try_wait_any().map(|_| ()));
}

// A waiter for AND 0x0F sees the pattern assembled across two set() calls
// and, on a manual-reset flag, leaves it in place.
#[test]
fn and_wait_across_staged_sets() {
    common::init();
    let flag = Arc::new(EventFlag::create(false).unwrap());
    let observed = Arc::new(AtomicUsize::new(0));

    let waiter_task = {
        let flag = Arc::clone(&flag);
        let observed = Arc::clone(&observed);
        Arc::new(move || {
            let pattern = flag.wait(0x0f, WaitMode::And).unwrap();
            observed.store(pattern, Ordering::SeqCst);
        })
    };
    let waiter = Thread::create(waiter_task).unwrap();
    waiter.start();

    flag.set(0x01).unwrap();
    Thread::sleep(10);
    flag.set(0x0e).unwrap();
    waiter.wait().unwrap();

    assert_eq!(0x0f, observed.load(Ordering::SeqCst));
    assert_eq!(0x0f, flag.current_pattern());
}

#[test]
fn blocked_waiter_is_released_by_set_one() {
    common::init();
    let flag = Arc::new(EventFlag::create(true).unwrap());
    let released = Arc::new(AtomicUsize::new(0));

    let waiter_task = {
        let flag = Arc::clone(&flag);
        let released = Arc::clone(&released);
        Arc::new(move || {
            flag.wait_one(5).unwrap();
            released.fetch_add(1, Ordering::SeqCst);
        })
    };
    let waiter = Thread::create(waiter_task).unwrap();
    waiter.start();
    Thread::sleep(20);
    assert_eq!(0, released.load(Ordering::SeqCst));

    flag.set_one(5).unwrap();
    waiter.wait().unwrap();
    assert_eq!(1, released.load(Ordering::SeqCst));
}
