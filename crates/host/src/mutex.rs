//! mutex.rs

use osal_core::error::{OsError, OsResult};
use osal_core::mutex::{MutexFactory, RawOsMutex};
use osal_core::timeout::Timeout;
use parking_lot::{Condvar, Mutex as PlMutex};
use std::sync::Arc;
use std::thread::ThreadId;

struct OwnerState {
    owner: Option<ThreadId>,
    count: usize,
}

/// Recursive timed mutex over a lock/condvar pair. Ownership is tracked by
/// OS thread id so re-locks by the owner nest and unlocks by anyone else are
/// rejected.
struct HostMutex {
    state: PlMutex<OwnerState>,
    cond: Condvar,
    ceiling: Option<i32>,
}

impl HostMutex {
    fn new(ceiling: Option<i32>) -> Self {
        Self {
            state: PlMutex::new(OwnerState {
                owner: None,
                count: 0,
            }),
            cond: Condvar::new(),
            ceiling,
        }
    }
}

impl RawOsMutex for HostMutex {
    fn lock(&self) -> OsResult {
        self.timed_lock(Timeout::Forever)
    }

    fn try_lock(&self) -> OsResult {
        self.timed_lock(Timeout::Polling)
    }

    fn timed_lock(&self, tmout: Timeout) -> OsResult {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        if state.owner == Some(me) {
            state.count += 1;
            return Ok(());
        }
        match tmout.to_duration() {
            None => {
                self.cond.wait_while(&mut state, |s| s.owner.is_some());
            }
            Some(duration) => {
                let result = self
                    .cond
                    .wait_while_for(&mut state, |s| s.owner.is_some(), duration);
                if result.timed_out() && state.owner.is_some() {
                    return Err(OsError::TimedOut);
                }
            }
        }
        state.owner = Some(me);
        state.count = 1;
        Ok(())
    }

    fn unlock(&self) -> OsResult {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(OsError::NotLocked);
        }
        state.count -= 1;
        if state.count == 0 {
            state.owner = None;
            self.cond.notify_one();
        }
        Ok(())
    }

    fn priority_ceiling(&self) -> Option<i32> {
        self.ceiling
    }
}

pub(crate) struct HostMutexFactory;

impl MutexFactory for HostMutexFactory {
    fn create(&self) -> Option<Arc<dyn RawOsMutex>> {
        Some(Arc::new(HostMutex::new(None)))
    }

    // The ceiling is advisory on this backend: recorded, not enforced.
    fn create_with_ceiling(&self, ceiling: i32) -> Option<Arc<dyn RawOsMutex>> {
        Some(Arc::new(HostMutex::new(Some(ceiling))))
    }
}
