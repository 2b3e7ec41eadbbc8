//! thread.rs

use crate::error::OsResult;
use crate::registry;
use crate::runnable::{Runnable, UncaughtErrorHandler};
use crate::timeout::Timeout;
use parking_lot::Mutex as PlMutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Backend side of a thread. One object per scheduling entity; the public
/// [`Thread`] handle delegates here.
pub trait RawThread: Send + Sync {
    /// Release the thread out of its created-idle state. Starting a thread
    /// that is already running is a no-op.
    fn start(&self);
    fn timed_wait(&self, tmout: Timeout) -> OsResult;
    fn is_finished(&self) -> bool;
    fn set_name(&self, name: &str);
    fn name(&self) -> String;
    fn set_priority(&self, priority: i32);
    fn priority(&self) -> i32;
    fn initial_priority(&self) -> i32;
    fn stack_size(&self) -> usize;
    fn native_handle(&self) -> Option<std::thread::Thread>;
    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>);
    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>>;
    /// Wait for the thread if needed, then reclaim the scheduling entity.
    /// Called exactly once, by the owning handle's drop.
    fn destroy(&self);
}

pub trait ThreadFactory: Send + Sync {
    fn create(
        &self,
        runnable: Arc<dyn Runnable>,
        priority: i32,
        stack_size: usize,
        name: &str,
    ) -> Option<Arc<dyn RawThread>>;
    fn sleep(&self, millis: u64);
    fn yield_now(&self);
    fn current(&self) -> Option<Arc<dyn RawThread>>;
    fn max_priority(&self) -> i32;
    fn min_priority(&self) -> i32;
    fn highest_priority(&self) -> i32;
    fn lowest_priority(&self) -> i32;
}

/// Creation parameters with the conventional defaults: inherit the creator's
/// priority, backend-default stack, empty name.
#[derive(Clone, Debug)]
pub struct ThreadConfig<'a> {
    pub priority: i32,
    pub stack_size: usize,
    pub name: &'a str,
}

impl Default for ThreadConfig<'_> {
    fn default() -> Self {
        Self {
            priority: Thread::INHERIT_PRIORITY,
            stack_size: 0,
            name: "",
        }
    }
}

static DEFAULT_HANDLER: PlMutex<Option<Arc<dyn UncaughtErrorHandler>>> = PlMutex::new(None);

/// A platform thread.
///
/// The handle returned by [`Thread::create`] owns the scheduling entity:
/// dropping it waits for the thread if needed and reclaims it through the
/// backend. Handles obtained from [`Thread::current`] are non-owning views
/// and reclaim nothing.
pub struct Thread {
    raw: Arc<dyn RawThread>,
    owned: bool,
}

impl Thread {
    /// Sentinel priority: adopt the creating thread's current priority at
    /// start time (or the normal priority if no current thread exists).
    pub const INHERIT_PRIORITY: i32 = i32::MIN;

    /// Create a thread in the idle state with default parameters.
    /// Returns `None` when the backend cannot allocate the thread.
    pub fn create(runnable: Arc<dyn Runnable>) -> Option<Thread> {
        Self::create_with(runnable, &ThreadConfig::default())
    }

    pub fn create_with(runnable: Arc<dyn Runnable>, config: &ThreadConfig<'_>) -> Option<Thread> {
        let raw = registry::THREAD_FACTORY.get().create(
            runnable,
            config.priority,
            config.stack_size,
            config.name,
        )?;
        Some(Thread { raw, owned: true })
    }

    pub fn sleep(millis: u64) {
        registry::THREAD_FACTORY.get().sleep(millis);
    }

    pub fn yield_now() {
        registry::THREAD_FACTORY.get().yield_now();
    }

    /// The thread this call runs on, if it was created through this layer.
    pub fn current() -> Option<Thread> {
        let raw = registry::THREAD_FACTORY.get().current()?;
        Some(Thread { raw, owned: false })
    }

    /// Cooperative early return from the current thread's `run()`.
    ///
    /// Unwinds with a sentinel that the entry wrapper swallows; the thread
    /// then finishes normally.
    pub fn exit() -> ! {
        panic::panic_any(ExitThread);
    }

    pub fn max_priority() -> i32 {
        registry::THREAD_FACTORY.get().max_priority()
    }

    pub fn min_priority() -> i32 {
        registry::THREAD_FACTORY.get().min_priority()
    }

    pub fn normal_priority() -> i32 {
        let factory = registry::THREAD_FACTORY.get();
        (factory.min_priority() + factory.max_priority()) / 2
    }

    /// The semantically highest priority, regardless of numeric direction.
    pub fn highest_priority() -> i32 {
        registry::THREAD_FACTORY.get().highest_priority()
    }

    pub fn lowest_priority() -> i32 {
        registry::THREAD_FACTORY.get().lowest_priority()
    }

    pub fn set_default_uncaught_error_handler(handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        *DEFAULT_HANDLER.lock() = handler;
    }

    pub fn default_uncaught_error_handler() -> Option<Arc<dyn UncaughtErrorHandler>> {
        DEFAULT_HANDLER.lock().clone()
    }

    pub fn start(&self) {
        self.raw.start();
    }

    /// Block until the thread finishes. Callers must have started the thread;
    /// waiting on a never-started thread is not part of the contract.
    pub fn wait(&self) -> OsResult {
        self.raw.timed_wait(Timeout::Forever)
    }

    pub fn try_wait(&self) -> OsResult {
        self.raw.timed_wait(Timeout::Polling)
    }

    pub fn timed_wait(&self, tmout: Timeout) -> OsResult {
        self.raw.timed_wait(tmout)
    }

    pub fn is_finished(&self) -> bool {
        self.raw.is_finished()
    }

    pub fn set_name(&self, name: &str) {
        self.raw.set_name(name);
    }

    pub fn name(&self) -> String {
        self.raw.name()
    }

    pub fn set_priority(&self, priority: i32) {
        self.raw.set_priority(priority);
    }

    pub fn priority(&self) -> i32 {
        self.raw.priority()
    }

    pub fn initial_priority(&self) -> i32 {
        self.raw.initial_priority()
    }

    pub fn stack_size(&self) -> usize {
        self.raw.stack_size()
    }

    pub fn native_handle(&self) -> Option<std::thread::Thread> {
        self.raw.native_handle()
    }

    pub fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        self.raw.set_uncaught_error_handler(handler);
    }

    pub fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.raw.uncaught_error_handler()
    }

    /// A non-owning view of the same thread.
    pub(crate) fn alias(&self) -> Thread {
        Thread {
            raw: Arc::clone(&self.raw),
            owned: false,
        }
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.owned {
            self.raw.destroy();
        }
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.raw.name())
            .field("priority", &self.raw.priority())
            .field("finished", &self.raw.is_finished())
            .finish()
    }
}

/// Sentinel unwind payload produced by [`Thread::exit`].
pub struct ExitThread;

/// Entry wrapper run by every backend thread and timer callback.
///
/// Runs the runnable to completion, swallows a cooperative [`Thread::exit`],
/// and routes any other unwind to `handler`, falling back to the process-wide
/// default handler. Failures with no handler anywhere are dropped.
pub fn guarded_run(
    runnable: &dyn Runnable,
    name: &str,
    handler: Option<Arc<dyn UncaughtErrorHandler>>,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| runnable.run()));
    let payload = match outcome {
        Ok(()) => return,
        Err(payload) => payload,
    };
    if payload.downcast_ref::<ExitThread>().is_some() {
        return;
    }
    let message = panic_message(payload.as_ref());
    warn!(thread = name, error = %message, "uncaught failure in runnable");
    let handler = handler.or_else(Thread::default_uncaught_error_handler);
    if let Some(handler) = handler {
        handler.handle(name, &message);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown failure".to_string()
    }
}
