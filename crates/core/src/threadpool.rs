//! threadpool.rs
//!
//! Work dispatch over a fixed worker set. Workers are created once, idle on a
//! per-worker event flag, and are handed fresh tasks through a bounded queue
//! of free runners; the queue bound is the pool's backpressure.

use crate::error::{OsError, OsResult};
use crate::eventflag::{EventFlag, Pattern, WaitMode};
use crate::queue::MessageQueue;
use crate::runnable::{Runnable, UncaughtErrorHandler};
use crate::thread::{self, Thread, ThreadConfig};
use crate::timeout::Timeout;
use parking_lot::Mutex as PlMutex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Release the worker out of its idle wait.
const GO: Pattern = 0b001;
/// Tear the worker loop down at pool destruction.
const QUIT: Pattern = 0b010;
/// Task finished; observed by the bound [`WaitGuard`].
const DONE: Pattern = 0b100;

type SharedHandler = Arc<PlMutex<Option<Arc<dyn UncaughtErrorHandler>>>>;

/// Worker-side wrapper around a pool task: runs it, then either releases
/// itself back to the free queue or hands that duty to the bound WaitGuard.
struct TaskRunner {
    index: usize,
    flag: EventFlag,
    slot: PlMutex<RunnerSlot>,
    free_queue: Arc<MessageQueue<usize>>,
    handler: SharedHandler,
    default_priority: i32,
    thread_name: String,
    thread: OnceLock<Thread>,
}

#[derive(Default)]
struct RunnerSlot {
    task: Option<Arc<dyn Runnable>>,
    needs_waiting: bool,
}

impl TaskRunner {
    fn release_to_queue(&self) {
        let _ = self.flag.reset(DONE);
        let _ = self.free_queue.send(self.index);
    }
}

impl Runnable for TaskRunner {
    /// The worker loop. Lives for the pool's whole lifetime; one iteration
    /// per dispatched task.
    fn run(&self) {
        loop {
            let observed = match self.flag.wait(GO | QUIT, WaitMode::Or) {
                Ok(observed) => observed,
                Err(_) => return,
            };
            let _ = self.flag.reset(GO);
            if observed & QUIT != 0 {
                return;
            }
            let (task, needs_waiting) = {
                let mut slot = self.slot.lock();
                (slot.task.take(), slot.needs_waiting)
            };
            if let Some(task) = task {
                let handler = self.handler.lock().clone();
                thread::guarded_run(task.as_ref(), &self.thread_name, handler);
            }
            if let Some(worker) = self.thread.get() {
                worker.set_priority(self.default_priority);
            }
            if needs_waiting {
                // The guard owns the rendezvous; it returns us to the queue.
                let _ = self.flag.set(DONE);
            } else {
                self.release_to_queue();
            }
        }
    }
}

/// A fixed set of reusable worker threads.
///
/// Dropping the pool waits for every in-flight task (including those held by
/// outstanding [`WaitGuard`]s), stops the workers, and reclaims them.
pub struct ThreadPool {
    runners: Vec<Arc<TaskRunner>>,
    threads: Vec<Thread>,
    free_queue: Arc<MessageQueue<usize>>,
    handler: SharedHandler,
    thread_name: String,
}

impl ThreadPool {
    /// Create a pool of `max_threads` workers at the normal priority with
    /// backend-default stacks.
    pub fn create(max_threads: usize) -> Option<ThreadPool> {
        if max_threads == 0 {
            return None;
        }
        Self::create_with(max_threads, 0, Thread::normal_priority(), "")
    }

    /// Workers start at `default_priority` and return to it after every
    /// task. Any allocation failure rolls back all partial allocations.
    pub fn create_with(
        max_threads: usize,
        stack_size: usize,
        default_priority: i32,
        thread_name: &str,
    ) -> Option<ThreadPool> {
        if max_threads == 0 {
            return None;
        }
        let free_queue = Arc::new(MessageQueue::create(max_threads)?);
        let handler: SharedHandler = Arc::new(PlMutex::new(None));

        let mut runners = Vec::with_capacity(max_threads);
        for index in 0..max_threads {
            runners.push(Arc::new(TaskRunner {
                index,
                flag: EventFlag::create(false)?,
                slot: PlMutex::new(RunnerSlot::default()),
                free_queue: Arc::clone(&free_queue),
                handler: Arc::clone(&handler),
                default_priority,
                thread_name: thread_name.to_string(),
                thread: OnceLock::new(),
            }));
        }

        let mut threads = Vec::with_capacity(max_threads);
        for runner in &runners {
            let config = ThreadConfig {
                priority: default_priority,
                stack_size,
                name: thread_name,
            };
            let worker = Thread::create_with(
                Arc::clone(runner) as Arc<dyn Runnable>,
                &config,
            )?;
            threads.push(worker);
        }

        for (runner, worker) in runners.iter().zip(&threads) {
            let _ = runner.thread.set(worker.alias());
            worker.start();
            let _ = free_queue.send(runner.index);
        }

        debug!(workers = max_threads, name = thread_name, "thread pool created");
        Some(ThreadPool {
            runners,
            threads,
            free_queue,
            handler,
            thread_name: thread_name.to_string(),
        })
    }

    /// Start `task` on a free worker, waiting forever for one.
    pub fn start(
        &self,
        task: Arc<dyn Runnable>,
        waiter: Option<&mut WaitGuard>,
        priority: i32,
    ) -> OsResult {
        self.timed_start(task, Timeout::Forever, waiter, priority)
    }

    /// Start `task` if a worker is free right now; `TimedOut` otherwise.
    pub fn try_start(
        &self,
        task: Arc<dyn Runnable>,
        waiter: Option<&mut WaitGuard>,
        priority: i32,
    ) -> OsResult {
        self.timed_start(task, Timeout::Polling, waiter, priority)
    }

    /// Start `task` on a free worker, waiting at most `tmout` for one.
    ///
    /// A supplied `waiter` must be invalid; it becomes valid on success and
    /// the caller must wait out the task through it (or let the guard's drop
    /// do so).
    pub fn timed_start(
        &self,
        task: Arc<dyn Runnable>,
        tmout: Timeout,
        waiter: Option<&mut WaitGuard>,
        priority: i32,
    ) -> OsResult {
        if let Some(waiter) = waiter.as_deref() {
            if waiter.is_valid() {
                return Err(OsError::InvalidParameter);
            }
        }
        let index = self.free_queue.timed_receive(tmout)?;
        let runner = &self.runners[index];
        {
            let mut slot = runner.slot.lock();
            slot.task = Some(task);
            slot.needs_waiting = waiter.is_some();
        }
        if let Some(waiter) = waiter {
            waiter.runner = Some(Arc::clone(runner));
        }

        let priority = if priority == Thread::INHERIT_PRIORITY {
            Thread::current()
                .map(|t| t.priority())
                .unwrap_or_else(Thread::normal_priority)
        } else {
            priority
        };
        self.threads[index].set_priority(priority);

        debug!(worker = index, priority, "dispatching pool task");
        runner.flag.set(GO)
    }

    pub fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        *self.handler.lock() = handler;
    }

    pub fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.handler.lock().clone()
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        debug!(name = %self.thread_name, "destroying thread pool");
        // Reclaiming every runner index waits out all in-flight tasks,
        // including those whose release is owed by a WaitGuard.
        for _ in 0..self.runners.len() {
            let _ = self.free_queue.receive();
        }
        for runner in &self.runners {
            let _ = runner.flag.set(QUIT);
        }
        for worker in &self.threads {
            let _ = worker.wait();
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.runners.len())
            .field("free", &self.free_queue.len())
            .field("name", &self.thread_name)
            .finish()
    }
}

/// Scoped completion handle for one in-flight pool task.
///
/// Starts invalid; [`ThreadPool::timed_start`] binds it to the dispatched
/// runner. A valid guard must be released — waiting out the task and
/// returning the runner to the free queue — which its drop performs on every
/// exit path. Waits on an invalid guard vacuously succeed.
#[derive(Default)]
pub struct WaitGuard {
    runner: Option<Arc<TaskRunner>>,
}

impl WaitGuard {
    pub fn new() -> WaitGuard {
        WaitGuard { runner: None }
    }

    pub fn is_valid(&self) -> bool {
        self.runner.is_some()
    }

    /// Block until the bound task has returned.
    pub fn wait(&self) -> OsResult {
        self.timed_wait(Timeout::Forever)
    }

    /// `TimedOut` when the bound task has not finished yet.
    pub fn try_wait(&self) -> OsResult {
        self.timed_wait(Timeout::Polling)
    }

    pub fn timed_wait(&self, tmout: Timeout) -> OsResult {
        match &self.runner {
            Some(runner) => runner.flag.timed_wait(DONE, WaitMode::Or, tmout).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Wait for the task, return the runner to the free queue, and turn the
    /// guard invalid. Idempotent.
    pub fn release(&mut self) {
        if let Some(runner) = self.runner.take() {
            let _ = runner.flag.wait(DONE, WaitMode::Or);
            runner.release_to_queue();
        }
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for WaitGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGuard")
            .field("valid", &self.is_valid())
            .finish()
    }
}
