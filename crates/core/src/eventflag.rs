//! eventflag.rs

use crate::error::{OsError, OsResult};
use crate::registry;
use crate::timeout::Timeout;
use std::sync::Arc;

/// The bit word waiters match against. Platform word size, at least 32 bits.
pub type Pattern = usize;

/// How a wait mask matches the current pattern: any bit ([`WaitMode::Or`]) or
/// all bits ([`WaitMode::And`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitMode {
    Or,
    And,
}

/// Backend side of an event flag.
///
/// The mask passed to `timed_wait` is validated by the public handle before
/// dispatch; backends only see non-zero masks.
pub trait RawEventFlag: Send + Sync {
    /// Wait until the mask matches, returning the pattern observed at the
    /// moment of release. Backends that cannot admit multiple simultaneous
    /// waiters return [`OsError::OtherThreadWaiting`] from the second
    /// concurrent wait.
    fn timed_wait(&self, pattern: Pattern, mode: WaitMode, tmout: Timeout) -> OsResult<Pattern>;
    fn set(&self, pattern: Pattern) -> OsResult;
    fn reset(&self, pattern: Pattern) -> OsResult;
    fn current_pattern(&self) -> Pattern;
}

pub trait EventFlagFactory: Send + Sync {
    fn create(&self, auto_reset: bool) -> Option<Arc<dyn RawEventFlag>>;
}

/// A multi-bit wait/notify primitive.
///
/// `set(p)` ors `p` into the pattern and makes every satisfied waiter
/// runnable; `reset(p)` clears exactly the bits in `p`. An auto-reset flag
/// clears the whole pattern when a wait returns successfully; a manual-reset
/// flag leaves it untouched.
#[derive(Clone)]
pub struct EventFlag {
    raw: Arc<dyn RawEventFlag>,
}

impl EventFlag {
    /// Width of [`Pattern`] in bits.
    pub const PATTERN_BITS: usize = Pattern::BITS as usize;

    pub fn create(auto_reset: bool) -> Option<EventFlag> {
        let raw = registry::EVENT_FLAG_FACTORY.get().create(auto_reset)?;
        Some(EventFlag { raw })
    }

    pub fn wait_any(&self) -> OsResult<Pattern> {
        self.timed_wait_any(Timeout::Forever)
    }

    pub fn wait_one(&self, pos: usize) -> OsResult<Pattern> {
        self.timed_wait_one(pos, Timeout::Forever)
    }

    pub fn wait(&self, pattern: Pattern, mode: WaitMode) -> OsResult<Pattern> {
        self.timed_wait(pattern, mode, Timeout::Forever)
    }

    pub fn try_wait_any(&self) -> OsResult<Pattern> {
        self.timed_wait_any(Timeout::Polling)
    }

    pub fn try_wait_one(&self, pos: usize) -> OsResult<Pattern> {
        self.timed_wait_one(pos, Timeout::Polling)
    }

    pub fn try_wait(&self, pattern: Pattern, mode: WaitMode) -> OsResult<Pattern> {
        self.timed_wait(pattern, mode, Timeout::Polling)
    }

    pub fn timed_wait_any(&self, tmout: Timeout) -> OsResult<Pattern> {
        self.raw.timed_wait(Pattern::MAX, WaitMode::Or, tmout)
    }

    pub fn timed_wait_one(&self, pos: usize, tmout: Timeout) -> OsResult<Pattern> {
        self.raw
            .timed_wait(Self::one_bit(pos)?, WaitMode::Or, tmout)
    }

    pub fn timed_wait(&self, pattern: Pattern, mode: WaitMode, tmout: Timeout) -> OsResult<Pattern> {
        if pattern == 0 {
            return Err(OsError::InvalidParameter);
        }
        self.raw.timed_wait(pattern, mode, tmout)
    }

    pub fn set_all(&self) -> OsResult {
        self.raw.set(Pattern::MAX)
    }

    pub fn set_one(&self, pos: usize) -> OsResult {
        self.raw.set(Self::one_bit(pos)?)
    }

    pub fn set(&self, pattern: Pattern) -> OsResult {
        self.raw.set(pattern)
    }

    pub fn reset_all(&self) -> OsResult {
        self.raw.reset(Pattern::MAX)
    }

    pub fn reset_one(&self, pos: usize) -> OsResult {
        self.raw.reset(Self::one_bit(pos)?)
    }

    pub fn reset(&self, pattern: Pattern) -> OsResult {
        self.raw.reset(pattern)
    }

    /// Snapshot of the current pattern.
    pub fn current_pattern(&self) -> Pattern {
        self.raw.current_pattern()
    }

    fn one_bit(pos: usize) -> OsResult<Pattern> {
        if pos >= Self::PATTERN_BITS {
            return Err(OsError::InvalidParameter);
        }
        Ok(1 << pos)
    }
}

impl std::fmt::Debug for EventFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventFlag({:#x})", self.raw.current_pattern())
    }
}
