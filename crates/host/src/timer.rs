//! timer.rs

use osal_core::runnable::{Runnable, UncaughtErrorHandler};
use osal_core::thread::{self, Thread, ThreadConfig};
use osal_core::timer::{
    OneShotTimerFactory, PeriodicTimerFactory, RawOneShotTimer, RawPeriodicTimer,
};
use parking_lot::{Condvar, Mutex as PlMutex};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;

/// Bridges a timer's private thread back to the timer object without a
/// reference cycle: the timer owns the thread, the thread's runnable holds
/// only a weak edge.
struct TimerLoop<T: Send + Sync>(Weak<T>, fn(&T));

impl<T: Send + Sync> Runnable for TimerLoop<T> {
    fn run(&self) {
        if let Some(timer) = self.0.upgrade() {
            (self.1)(&timer);
        }
    }
}

struct PeriodicState {
    active: bool,
    stopped: bool,
    end_requested: bool,
    name: String,
}

/// Interval scheduler on a private highest-priority thread. Invocations
/// never overlap; the next one is armed only after the previous returns.
pub(crate) struct HostPeriodicTimer {
    period_millis: u64,
    runnable: Arc<dyn Runnable>,
    state: PlMutex<PeriodicState>,
    cond_started: Condvar,
    cond_stopped: Condvar,
    handler: PlMutex<Option<Arc<dyn UncaughtErrorHandler>>>,
    thread: PlMutex<Option<Thread>>,
}

impl HostPeriodicTimer {
    fn thread_loop(&self) {
        loop {
            {
                let mut state = self.state.lock();
                self.cond_started
                    .wait_while(&mut state, |s| !s.active && !s.end_requested);
                if state.end_requested {
                    return;
                }
            }
            loop {
                {
                    let mut state = self.state.lock();
                    let result = self.cond_started.wait_while_for(
                        &mut state,
                        |s| s.active && !s.end_requested,
                        Duration::from_millis(self.period_millis),
                    );
                    if !result.timed_out() {
                        state.stopped = true;
                        self.cond_stopped.notify_all();
                        if state.end_requested {
                            return;
                        }
                        break;
                    }
                }
                self.timer_main();
            }
        }
    }

    fn timer_main(&self) {
        let name = self.state.lock().name.clone();
        let handler = self.handler.lock().clone();
        thread::guarded_run(self.runnable.as_ref(), &name, handler);
    }
}

impl RawPeriodicTimer for HostPeriodicTimer {
    fn start(&self) {
        let mut state = self.state.lock();
        if state.active {
            return;
        }
        // A previous stop may still be draining its in-flight invocation.
        self.cond_stopped.wait_while(&mut state, |s| !s.stopped);
        debug!(period = self.period_millis, name = %state.name, "starting periodic timer");
        state.stopped = false;
        state.active = true;
        self.cond_started.notify_all();
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        debug!(name = %state.name, "stopping periodic timer");
        state.active = false;
        self.cond_started.notify_all();
    }

    fn is_started(&self) -> bool {
        self.state.lock().active
    }

    fn period_millis(&self) -> u64 {
        self.period_millis
    }

    fn set_name(&self, name: &str) {
        self.state.lock().name = name.to_string();
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        *self.handler.lock() = handler;
    }

    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.handler.lock().clone()
    }

    fn destroy(&self) {
        {
            let mut state = self.state.lock();
            state.end_requested = true;
            self.cond_started.notify_all();
        }
        let timer_thread = self.thread.lock().take();
        if let Some(timer_thread) = timer_thread {
            let _ = timer_thread.wait();
        }
    }
}

struct OneShotState {
    delay_millis: u64,
    active: bool,
    started: bool,
    stopped: bool,
    end_requested: bool,
    name: String,
}

/// Delayed single-shot task on a private highest-priority thread. One
/// invocation per start() unless stop() wins the race.
pub(crate) struct HostOneShotTimer {
    runnable: Arc<dyn Runnable>,
    state: PlMutex<OneShotState>,
    cond_active: Condvar,
    cond_started: Condvar,
    cond_stopped: Condvar,
    handler: PlMutex<Option<Arc<dyn UncaughtErrorHandler>>>,
    thread: PlMutex<Option<Thread>>,
}

impl HostOneShotTimer {
    fn thread_loop(&self) {
        loop {
            {
                let mut state = self.state.lock();
                self.cond_active
                    .wait_while(&mut state, |s| !s.active && !s.end_requested);
                state.started = true;
                self.cond_started.notify_all();
                if state.end_requested {
                    return;
                }
                let delay = Duration::from_millis(state.delay_millis);
                let result =
                    self.cond_active
                        .wait_while_for(&mut state, |s| s.active && !s.end_requested, delay);
                if !result.timed_out() {
                    // Cancelled before firing.
                    state.stopped = true;
                    self.cond_stopped.notify_all();
                    if state.end_requested {
                        return;
                    }
                    continue;
                }
            }
            self.timer_main();
            {
                let mut state = self.state.lock();
                state.started = false;
                state.stopped = true;
                state.active = false;
                self.cond_stopped.notify_all();
            }
        }
    }

    fn timer_main(&self) {
        let name = self.state.lock().name.clone();
        let handler = self.handler.lock().clone();
        thread::guarded_run(self.runnable.as_ref(), &name, handler);
    }
}

impl RawOneShotTimer for HostOneShotTimer {
    fn start(&self, delay_millis: u64) {
        let mut state = self.state.lock();
        if state.active {
            return;
        }
        self.cond_stopped.wait_while(&mut state, |s| !s.stopped);
        debug!(delay = delay_millis, name = %state.name, "starting one-shot timer");
        state.delay_millis = delay_millis;
        state.stopped = false;
        state.active = true;
        self.cond_active.notify_all();
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if !state.active {
            return;
        }
        // The loop must have reached its delay wait before the cancel
        // signal can be observed.
        self.cond_started.wait_while(&mut state, |s| !s.started);
        debug!(name = %state.name, "stopping one-shot timer");
        state.started = false;
        state.active = false;
        self.cond_active.notify_all();
    }

    fn is_started(&self) -> bool {
        self.state.lock().active
    }

    fn set_name(&self, name: &str) {
        self.state.lock().name = name.to_string();
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn set_uncaught_error_handler(&self, handler: Option<Arc<dyn UncaughtErrorHandler>>) {
        *self.handler.lock() = handler;
    }

    fn uncaught_error_handler(&self) -> Option<Arc<dyn UncaughtErrorHandler>> {
        self.handler.lock().clone()
    }

    fn destroy(&self) {
        {
            let mut state = self.state.lock();
            state.end_requested = true;
            self.cond_active.notify_all();
        }
        let timer_thread = self.thread.lock().take();
        if let Some(timer_thread) = timer_thread {
            let _ = timer_thread.wait();
        }
    }
}

fn spawn_timer_thread<T>(timer: &Arc<T>, entry: fn(&T), name: &str) -> Option<Thread>
where
    T: Send + Sync + 'static,
{
    let task: Arc<dyn Runnable> = Arc::new(TimerLoop(Arc::downgrade(timer), entry));
    let config = ThreadConfig {
        priority: Thread::highest_priority(),
        stack_size: 0,
        name,
    };
    let timer_thread = Thread::create_with(task, &config)?;
    timer_thread.start();
    Some(timer_thread)
}

pub(crate) struct HostPeriodicTimerFactory;

impl PeriodicTimerFactory for HostPeriodicTimerFactory {
    fn create(
        &self,
        runnable: Arc<dyn Runnable>,
        period_millis: u64,
        name: &str,
    ) -> Option<Arc<dyn RawPeriodicTimer>> {
        let timer = Arc::new(HostPeriodicTimer {
            period_millis,
            runnable,
            state: PlMutex::new(PeriodicState {
                active: false,
                stopped: true,
                end_requested: false,
                name: name.to_string(),
            }),
            cond_started: Condvar::new(),
            cond_stopped: Condvar::new(),
            handler: PlMutex::new(None),
            thread: PlMutex::new(None),
        });
        let timer_thread = spawn_timer_thread(&timer, HostPeriodicTimer::thread_loop, name)?;
        *timer.thread.lock() = Some(timer_thread);
        Some(timer as Arc<dyn RawPeriodicTimer>)
    }
}

pub(crate) struct HostOneShotTimerFactory;

impl OneShotTimerFactory for HostOneShotTimerFactory {
    fn create(
        &self,
        runnable: Arc<dyn Runnable>,
        name: &str,
    ) -> Option<Arc<dyn RawOneShotTimer>> {
        let timer = Arc::new(HostOneShotTimer {
            runnable,
            state: PlMutex::new(OneShotState {
                delay_millis: 0,
                active: false,
                started: false,
                stopped: true,
                end_requested: false,
                name: name.to_string(),
            }),
            cond_active: Condvar::new(),
            cond_started: Condvar::new(),
            cond_stopped: Condvar::new(),
            handler: PlMutex::new(None),
            thread: PlMutex::new(None),
        });
        let timer_thread = spawn_timer_thread(&timer, HostOneShotTimer::thread_loop, name)?;
        *timer.thread.lock() = Some(timer_thread);
        Some(timer as Arc<dyn RawOneShotTimer>)
    }
}
