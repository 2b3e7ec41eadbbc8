//! timeout.rs

use std::time::{Duration, Instant};

/// How long a blocking operation may suspend the caller.
///
/// `Polling` must short-circuit every blocking path; `Forever` never produces
/// [`OsError::TimedOut`](crate::OsError::TimedOut); a finite value suspends
/// at most the given number of milliseconds plus backend tolerance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Timeout {
    /// Query the condition without blocking.
    Polling,
    /// Wait until the condition is satisfied.
    Forever,
    /// Wait at most this many milliseconds.
    Millis(u64),
}

impl Timeout {
    pub const fn is_polling(&self) -> bool {
        matches!(self, Timeout::Polling)
    }

    pub const fn is_forever(&self) -> bool {
        matches!(self, Timeout::Forever)
    }

    /// Finite timeouts as a [`Duration`]; `None` for `Forever`.
    pub const fn to_duration(&self) -> Option<Duration> {
        match self {
            Timeout::Polling => Some(Duration::ZERO),
            Timeout::Forever => None,
            Timeout::Millis(ms) => Some(Duration::from_millis(*ms)),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Self {
        Timeout::Millis(value.as_millis() as u64)
    }
}

/// Tracks how much of a [`Timeout`] is left across a retry loop.
///
/// Operations that wait in stages (the bounded queue, the pool dispatch)
/// re-arm their inner waits with the remaining budget so the overall
/// operation honors the caller's deadline.
#[derive(Copy, Clone, Debug)]
pub struct Deadline {
    kind: Timeout,
    due: Option<Instant>,
}

impl Deadline {
    pub fn start(tmout: Timeout) -> Self {
        let due = match tmout {
            Timeout::Millis(ms) => Instant::now().checked_add(Duration::from_millis(ms)),
            _ => None,
        };
        Self { kind: tmout, due }
    }

    /// The portion of the original timeout still available.
    pub fn remaining(&self) -> Timeout {
        match self.kind {
            Timeout::Polling => Timeout::Polling,
            Timeout::Forever => Timeout::Forever,
            Timeout::Millis(_) => {
                let due = match self.due {
                    Some(due) => due,
                    None => return Timeout::Forever,
                };
                let left = due.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    Timeout::Polling
                } else {
                    Timeout::Millis(left.as_millis().max(1) as u64)
                }
            }
        }
    }
}
