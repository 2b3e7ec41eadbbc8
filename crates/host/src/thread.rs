//! thread.rs

use osal_core::error::{OsError, OsResult};
use osal_core::runnable::{Runnable, UncaughtErrorHandler};
use osal_core::thread::{self, RawThread, Thread, ThreadFactory};
use osal_core::timeout::Timeout;
use parking_lot::{Condvar, Mutex as PlMutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{Builder, JoinHandle, ThreadId};

/// Reported when the caller did not request a specific stack size; the host
/// runtime's own default.
const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

struct ThreadState {
    active: bool,
    end_requested: bool,
    priority: i32,
    initial_priority: i32,
    name: String,
    stack_size: usize,
}

pub(crate) struct HostThread {
    runnable: Arc<dyn Runnable>,
    state: PlMutex<ThreadState>,
    cond_started: Condvar,
    cond_finished: Condvar,
    handler: PlMutex<Option<Arc<dyn UncaughtErrorHandler>>>,
    join: PlMutex<Option<JoinHandle<()>>>,
}

impl HostThread {
    fn new(runnable: Arc<dyn Runnable>, priority: i32, stack_size: usize, name: &str) -> Self {
        Self {
            runnable,
            state: PlMutex::new(ThreadState {
                active: false,
                end_requested: false,
                priority,
                initial_priority: priority,
                name: name.to_string(),
                stack_size,
            }),
            cond_started: Condvar::new(),
            cond_finished: Condvar::new(),
            handler: PlMutex::new(None),
            join: PlMutex::new(None),
        }
    }

    /// Body of the backing OS thread: park until released, run the runnable
    /// through the entry wrapper, publish the finish, park again. The loop
    /// only unwinds when reclamation asks for it.
    fn thread_loop(&self) {
        loop {
            {
                let mut state = self.state.lock();
                self.cond_started.wait_while(&mut state, |s| !s.active);
                if state.end_requested {
                    return;
                }
            }
            let name = self.state.lock().name.clone();
            let handler = self.handler.lock().clone();
            thread::guarded_run(self.runnable.as_ref(), &name, handler);
            {
                let mut state = self.state.lock();
                state.active = false;
                self.cond_finished.notify_all();
            }
        }
    }
}

impl RawThread for HostThread {
    fn start(&self) {
        let mut state = self.state.lock();
        if state.active {
            return;
        }
        state.active = true;
        self.cond_started.notify_all();
    }

    fn timed_wait(&self, tmout: Timeout) -> OsResult {
        let mut state = self.state.lock();
        match tmout.to_duration() {
            None => {
                self.cond_finished.wait_while(&mut state, |s| s.active);
                Ok(())
            }
            Some(duration) => {
                let result = self
                    .cond_finished
                    .wait_while_for(&mut state, |s| s.active, duration);
                if result.timed_out() && state.active {
                    Err(OsError::TimedOut)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn is_finished(&self) -> bool {
        !self.state.lock().active
    }

    fn set_name(&self, name: &str) {
        self.state.lock().name = name.to_string();
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn set_priority(&self, priority: i32) {
        // The host scheduler is untouched; the logical value is what the
        // rest of the layer observes.
        if priority != Thread::INHERIT_PRIORITY
            && (Thread::min_priority()..=Thread::max_priority()).contains(&priority)
        {
            self.state.lock().priority = priority;
            return;
        }
        // Inherit: adopt the calling thread's current priority, or the
        // normal priority when the caller is not a layer thread.
        let inherited = Thread::current()
            .map(|current| current.priority())
            .unwrap_or_else(Thread::normal_priority);
        self.state.lock().priority = inherited;
    }

    fn priority(&self) -> i32 {
        self.state.lock().priority
    }

    fn initial_priority(&self) -> i32 {
        self.state.lock().initial_priority
    }

    fn stack_size(&self) -> usize {
        let requested = self.state.lock().stack_size;
        if requested == 0 {
            DEFAULT_STACK_SIZE
        } else {
            requested
        }
    }

    fn native_handle(&self) -> Option<std::thread::Thread> {
        self.join.lock().as_ref().map(|h| h.thread().clone())
    }

    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        *self.handler.lock() = handler;
    }

    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.handler.lock().clone()
    }

    fn destroy(&self) {
        // Let any in-flight run finish, then unwind the loop and join.
        let _ = self.timed_wait(Timeout::Forever);
        {
            let mut state = self.state.lock();
            state.end_requested = true;
            state.active = true;
            self.cond_started.notify_all();
        }
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[derive(Copy, Clone)]
struct PriorityRange {
    lowest: i32,
    highest: i32,
}

/// Creates threads over `std::thread` and tracks them so
/// [`Thread::current`] can resolve the calling thread.
pub struct HostThreadFactory {
    range: PlMutex<PriorityRange>,
    threads: PlMutex<HashMap<ThreadId, Weak<HostThread>>>,
}

impl HostThreadFactory {
    pub fn new(lowest_priority: i32, highest_priority: i32) -> Self {
        Self {
            range: PlMutex::new(PriorityRange {
                lowest: lowest_priority,
                highest: highest_priority,
            }),
            threads: PlMutex::new(HashMap::new()),
        }
    }

    pub fn set_priority_range(&self, lowest_priority: i32, highest_priority: i32) {
        *self.range.lock() = PriorityRange {
            lowest: lowest_priority,
            highest: highest_priority,
        };
    }
}

impl ThreadFactory for HostThreadFactory {
    fn create(
        &self,
        runnable: Arc<dyn Runnable>,
        priority: i32,
        stack_size: usize,
        name: &str,
    ) -> Option<Arc<dyn RawThread>> {
        let host = Arc::new(HostThread::new(runnable, priority, stack_size, name));

        let mut builder = Builder::new();
        if !name.is_empty() {
            builder = builder.name(name.to_string());
        }
        if stack_size > 0 {
            builder = builder.stack_size(stack_size);
        }
        let entry = Arc::clone(&host);
        let handle = builder.spawn(move || entry.thread_loop()).ok()?;
        let id = handle.thread().id();
        *host.join.lock() = Some(handle);

        {
            let mut threads = self.threads.lock();
            threads.retain(|_, weak| weak.strong_count() > 0);
            threads.insert(id, Arc::downgrade(&host));
        }

        // Resolve INHERIT against the creating thread and pin the initial
        // priority to the result.
        host.set_priority(priority);
        let mut state = host.state.lock();
        state.initial_priority = state.priority;
        drop(state);

        Some(host)
    }

    fn sleep(&self, millis: u64) {
        std::thread::sleep(std::time::Duration::from_millis(millis));
    }

    fn yield_now(&self) {
        std::thread::yield_now();
    }

    fn current(&self) -> Option<Arc<dyn RawThread>> {
        let threads = self.threads.lock();
        let weak = threads.get(&std::thread::current().id())?;
        let host = weak.upgrade()?;
        Some(host as Arc<dyn RawThread>)
    }

    fn max_priority(&self) -> i32 {
        let range = self.range.lock();
        range.lowest.max(range.highest)
    }

    fn min_priority(&self) -> i32 {
        let range = self.range.lock();
        range.lowest.min(range.highest)
    }

    fn highest_priority(&self) -> i32 {
        self.range.lock().highest
    }

    fn lowest_priority(&self) -> i32 {
        self.range.lock().lowest
    }
}
