//! error.rs

use thiserror::Error;

/// Result alias used by every fallible operation in the layer.
///
/// Success is the `Ok` arm; the error taxonomy is closed and returned by
/// value, never panicked across the public API.
pub type OsResult<T = ()> = Result<T, OsError>;

/// Error kinds shared by all resource kinds.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OsError {
    /// The deadline elapsed without acquiring the condition. Also signals
    /// "queue full / empty" uniformly for polling operations.
    #[error("timed out")]
    TimedOut,
    /// Zero wait mask, out-of-range bit position, zero capacity, and similar
    /// argument violations.
    #[error("invalid parameter")]
    InvalidParameter,
    /// A blocking operation was invoked from a context where blocking is
    /// disallowed (e.g. an interrupt handler on an RTOS backend).
    #[error("called by non-thread context")]
    CalledByNonThread,
    /// Unlock attempted by a caller that does not hold the mutex.
    #[error("not locked by caller")]
    NotLocked,
    /// The backend cannot admit another concurrent waiter on this object.
    #[error("other thread already waiting")]
    OtherThreadWaiting,
    /// Backend-reported generic failure.
    #[error("backend failure => {0}")]
    Other(&'static str),
}
