use crate::timeout::{Deadline, Timeout};
use std::time::Duration;

#[test]
fn polling_and_forever_shapes() {
    assert!(Timeout::Polling.is_polling());
    assert!(!Timeout::Polling.is_forever());
    assert!(Timeout::Forever.is_forever());
    assert!(!Timeout::Millis(10).is_polling());
}

#[test]
fn to_duration() {
    assert_eq!(Some(Duration::ZERO), Timeout::Polling.to_duration());
    assert_eq!(None, Timeout::Forever.to_duration());
    assert_eq!(
        Some(Duration::from_millis(250)),
        Timeout::Millis(250).to_duration()
    );
}

#[test]
fn from_duration() {
    assert_eq!(
        Timeout::Millis(1500),
        Timeout::from(Duration::from_millis(1500))
    );
}

#[test]
fn deadline_preserves_polling_and_forever() {
    assert_eq!(Timeout::Polling, Deadline::start(Timeout::Polling).remaining());
    assert_eq!(Timeout::Forever, Deadline::start(Timeout::Forever).remaining());
}

#[test]
fn deadline_counts_down_to_polling() {
    let deadline = Deadline::start(Timeout::Millis(200));
    match deadline.remaining() {
        Timeout::Millis(left) => assert!(left <= 200),
        other => panic!("expected a finite remainder, got {other:?}"),
    }

    let expired = Deadline::start(Timeout::Millis(1));
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(Timeout::Polling, expired.remaining());
}
