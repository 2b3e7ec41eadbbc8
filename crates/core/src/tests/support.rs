//! A polling-only event flag stub so queue and flag plumbing can be unit
//! tested without a real backend. Blocking waits are out of scope here; the
//! host backend's integration tests cover those.

use crate::error::{OsError, OsResult};
use crate::eventflag::{EventFlagFactory, Pattern, RawEventFlag, WaitMode};
use crate::registry;
use crate::timeout::Timeout;
use parking_lot::Mutex as PlMutex;
use std::sync::{Arc, Once};

struct StubEventFlag {
    auto_reset: bool,
    pattern: PlMutex<Pattern>,
}

impl RawEventFlag for StubEventFlag {
    fn timed_wait(&self, pattern: Pattern, mode: WaitMode, _tmout: Timeout) -> OsResult<Pattern> {
        let mut current = self.pattern.lock();
        let satisfied = match mode {
            WaitMode::Or => *current & pattern != 0,
            WaitMode::And => *current & pattern == pattern,
        };
        if !satisfied {
            return Err(OsError::TimedOut);
        }
        let observed = *current;
        if self.auto_reset {
            *current = 0;
        }
        Ok(observed)
    }

    fn set(&self, pattern: Pattern) -> OsResult {
        *self.pattern.lock() |= pattern;
        Ok(())
    }

    fn reset(&self, pattern: Pattern) -> OsResult {
        *self.pattern.lock() &= !pattern;
        Ok(())
    }

    fn current_pattern(&self) -> Pattern {
        *self.pattern.lock()
    }
}

struct StubEventFlagFactory;

impl EventFlagFactory for StubEventFlagFactory {
    fn create(&self, auto_reset: bool) -> Option<Arc<dyn RawEventFlag>> {
        Some(Arc::new(StubEventFlag {
            auto_reset,
            pattern: PlMutex::new(0),
        }))
    }
}

static REGISTER: Once = Once::new();

pub fn register_stub_backend() {
    REGISTER.call_once(|| {
        registry::register_event_flag_factory(Arc::new(StubEventFlagFactory));
    });
}
