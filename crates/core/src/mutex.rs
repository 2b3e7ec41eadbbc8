//! mutex.rs

use crate::error::OsResult;
use crate::registry;
use crate::timeout::Timeout;
use std::sync::Arc;

/// Backend side of a recursive timed mutex.
pub trait RawOsMutex: Send + Sync {
    fn lock(&self) -> OsResult;
    fn try_lock(&self) -> OsResult;
    fn timed_lock(&self, tmout: Timeout) -> OsResult;
    /// Unlock by a caller that does not hold the mutex returns
    /// [`OsError::NotLocked`](crate::OsError::NotLocked).
    fn unlock(&self) -> OsResult;
    fn priority_ceiling(&self) -> Option<i32>;
}

pub trait MutexFactory: Send + Sync {
    fn create(&self) -> Option<Arc<dyn RawOsMutex>>;
    fn create_with_ceiling(&self, ceiling: i32) -> Option<Arc<dyn RawOsMutex>>;
}

/// A recursive mutex: the owning thread may re-lock and must unlock once per
/// lock. Lock/unlock pairs may span scopes; [`LockGuard`] covers the scoped
/// case.
#[derive(Clone)]
pub struct Mutex {
    raw: Arc<dyn RawOsMutex>,
}

impl Mutex {
    pub fn create() -> Option<Mutex> {
        let raw = registry::MUTEX_FACTORY.get().create()?;
        Some(Mutex { raw })
    }

    /// Create with an advisory priority-ceiling value. Backends with a
    /// ceiling or inheritance protocol apply it transparently.
    pub fn create_with_ceiling(ceiling: i32) -> Option<Mutex> {
        let raw = registry::MUTEX_FACTORY.get().create_with_ceiling(ceiling)?;
        Some(Mutex { raw })
    }

    pub fn lock(&self) -> OsResult {
        self.raw.lock()
    }

    pub fn try_lock(&self) -> OsResult {
        self.raw.try_lock()
    }

    pub fn timed_lock(&self, tmout: Timeout) -> OsResult {
        self.raw.timed_lock(tmout)
    }

    pub fn unlock(&self) -> OsResult {
        self.raw.unlock()
    }

    pub fn priority_ceiling(&self) -> Option<i32> {
        self.raw.priority_ceiling()
    }
}

impl std::fmt::Debug for Mutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("priority_ceiling", &self.raw.priority_ceiling())
            .finish()
    }
}

/// Scoped ownership of a [`Mutex`]: locks at construction, unlocks on every
/// control-flow exit. Not copyable; moves follow the value.
pub struct LockGuard<'a> {
    mutex: &'a Mutex,
}

impl<'a> LockGuard<'a> {
    pub fn new(mutex: &'a Mutex) -> OsResult<LockGuard<'a>> {
        mutex.lock()?;
        Ok(LockGuard { mutex })
    }

    pub fn try_new(mutex: &'a Mutex) -> OsResult<LockGuard<'a>> {
        mutex.try_lock()?;
        Ok(LockGuard { mutex })
    }

    pub fn timed_new(mutex: &'a Mutex, tmout: Timeout) -> OsResult<LockGuard<'a>> {
        mutex.timed_lock(tmout)?;
        Ok(LockGuard { mutex })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // The guard holds the lock by construction; a NotLocked here would
        // mean an unlock() snuck in through the raw handle.
        let _ = self.mutex.unlock();
    }
}
