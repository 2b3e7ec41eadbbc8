//! eventflag.rs

use osal_core::error::{OsError, OsResult};
use osal_core::eventflag::{EventFlagFactory, Pattern, RawEventFlag, WaitMode};
use osal_core::timeout::Timeout;
use parking_lot::{Condvar, Mutex as PlMutex};
use std::sync::Arc;

fn matches(current: Pattern, pattern: Pattern, mode: WaitMode) -> bool {
    match mode {
        WaitMode::Or => current & pattern != 0,
        WaitMode::And => current & pattern == pattern,
    }
}

/// Condvar-backed event flag. Any number of concurrent waiters is admitted;
/// on a set() every satisfied waiter becomes runnable, and with auto-reset
/// the first to reacquire the internal lock consumes the whole pattern.
struct HostEventFlag {
    auto_reset: bool,
    pattern: PlMutex<Pattern>,
    cond: Condvar,
}

impl RawEventFlag for HostEventFlag {
    fn timed_wait(&self, pattern: Pattern, mode: WaitMode, tmout: Timeout) -> OsResult<Pattern> {
        let mut current = self.pattern.lock();
        match tmout.to_duration() {
            None => {
                self.cond
                    .wait_while(&mut current, |c| !matches(*c, pattern, mode));
            }
            Some(duration) => {
                let result =
                    self.cond
                        .wait_while_for(&mut current, |c| !matches(*c, pattern, mode), duration);
                if result.timed_out() && !matches(*current, pattern, mode) {
                    return Err(OsError::TimedOut);
                }
            }
        }
        let observed = *current;
        if self.auto_reset {
            *current = 0;
        }
        Ok(observed)
    }

    fn set(&self, pattern: Pattern) -> OsResult {
        let mut current = self.pattern.lock();
        *current |= pattern;
        self.cond.notify_all();
        Ok(())
    }

    fn reset(&self, pattern: Pattern) -> OsResult {
        let mut current = self.pattern.lock();
        *current &= !pattern;
        Ok(())
    }

    fn current_pattern(&self) -> Pattern {
        *self.pattern.lock()
    }
}

pub(crate) struct HostEventFlagFactory;

impl EventFlagFactory for HostEventFlagFactory {
    fn create(&self, auto_reset: bool) -> Option<Arc<dyn RawEventFlag>> {
        Some(Arc::new(HostEventFlag {
            auto_reset,
            pattern: PlMutex::new(0),
            cond: Condvar::new(),
        }))
    }
}
