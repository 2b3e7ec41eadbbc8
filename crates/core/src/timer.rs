//! timer.rs

use crate::registry;
use crate::runnable::{Runnable, UncaughtErrorHandler};
use std::sync::Arc;

/// Backend side of a periodic timer.
pub trait RawPeriodicTimer: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn is_started(&self) -> bool;
    fn period_millis(&self) -> u64;
    fn set_name(&self, name: &str);
    fn name(&self) -> String;
    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>);
    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>>;
    /// Wait out any in-flight invocation and reclaim the timer thread.
    fn destroy(&self);
}

/// Backend side of a one-shot timer.
pub trait RawOneShotTimer: Send + Sync {
    fn start(&self, delay_millis: u64);
    fn stop(&self);
    fn is_started(&self) -> bool;
    fn set_name(&self, name: &str);
    fn name(&self) -> String;
    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>);
    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>>;
    fn destroy(&self);
}

pub trait PeriodicTimerFactory: Send + Sync {
    fn create(
        &self,
        runnable: Arc<dyn Runnable>,
        period_millis: u64,
        name: &str,
    ) -> Option<Arc<dyn RawPeriodicTimer>>;
}

pub trait OneShotTimerFactory: Send + Sync {
    fn create(&self, runnable: Arc<dyn Runnable>, name: &str)
        -> Option<Arc<dyn RawOneShotTimer>>;
}

/// Invokes its task at approximately `period` millisecond intervals between
/// `start()` and `stop()`. The next invocation is never issued before the
/// previous one returns; the timer thread runs at the backend's highest
/// priority. Dropping the handle waits out any in-flight invocation.
pub struct PeriodicTimer {
    raw: Arc<dyn RawPeriodicTimer>,
}

impl PeriodicTimer {
    /// A zero period yields `None`.
    pub fn create(
        runnable: Arc<dyn Runnable>,
        period_millis: u64,
        name: &str,
    ) -> Option<PeriodicTimer> {
        if period_millis == 0 {
            return None;
        }
        let raw = registry::PERIODIC_TIMER_FACTORY
            .get()
            .create(runnable, period_millis, name)?;
        Some(PeriodicTimer { raw })
    }

    /// Idempotent: a second start while active is a no-op.
    pub fn start(&self) {
        self.raw.start();
    }

    /// Idempotent. An in-flight invocation finishes undisturbed.
    pub fn stop(&self) {
        self.raw.stop();
    }

    pub fn is_started(&self) -> bool {
        self.raw.is_started()
    }

    pub fn period_millis(&self) -> u64 {
        self.raw.period_millis()
    }

    pub fn set_name(&self, name: &str) {
        self.raw.set_name(name);
    }

    pub fn name(&self) -> String {
        self.raw.name()
    }

    pub fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        self.raw.set_uncaught_error_handler(handler);
    }

    pub fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.raw.uncaught_error_handler()
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.raw.destroy();
    }
}

impl std::fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("name", &self.raw.name())
            .field("period_millis", &self.raw.period_millis())
            .field("started", &self.raw.is_started())
            .finish()
    }
}

/// Runs its task exactly once per `start(delay)` unless `stop()` wins the
/// race before the delay elapses. A repeat start while armed is a no-op.
pub struct OneShotTimer {
    raw: Arc<dyn RawOneShotTimer>,
}

impl OneShotTimer {
    pub fn create(runnable: Arc<dyn Runnable>, name: &str) -> Option<OneShotTimer> {
        let raw = registry::ONE_SHOT_TIMER_FACTORY.get().create(runnable, name)?;
        Some(OneShotTimer { raw })
    }

    /// Schedule one invocation at least `delay_millis` in the future.
    pub fn start(&self, delay_millis: u64) {
        self.raw.start(delay_millis);
    }

    /// Cancel a pending shot; a no-op once the task has fired.
    pub fn stop(&self) {
        self.raw.stop();
    }

    pub fn is_started(&self) -> bool {
        self.raw.is_started()
    }

    pub fn set_name(&self, name: &str) {
        self.raw.set_name(name);
    }

    pub fn name(&self) -> String {
        self.raw.name()
    }

    pub fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        self.raw.set_uncaught_error_handler(handler);
    }

    pub fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.raw.uncaught_error_handler()
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.raw.destroy();
    }
}

impl std::fmt::Debug for OneShotTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneShotTimer")
            .field("name", &self.raw.name())
            .field("started", &self.raw.is_started())
            .finish()
    }
}
