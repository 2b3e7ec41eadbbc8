//! osal-core
//!
//! Portable concurrency layer. Every resource kind (threads, mutexes, event
//! flags, memory pools, timers) is fronted by a trait and created through a
//! process-wide factory registered by exactly one backend crate at startup.

#[cfg(test)]
mod tests;

pub mod error;
pub mod eventflag;
pub mod mutex;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod runnable;
pub mod thread;
pub mod threadpool;
pub mod timeout;
pub mod timer;

pub use error::{OsError, OsResult};
pub use eventflag::{EventFlag, Pattern, WaitMode};
pub use mutex::{LockGuard, Mutex};
pub use pool::{FixedAllocator, FixedMemoryPool, VariableAllocator, VariableMemoryPool};
pub use queue::MessageQueue;
pub use runnable::{Runnable, UncaughtErrorHandler};
pub use thread::Thread;
pub use threadpool::{ThreadPool, WaitGuard};
pub use timeout::Timeout;
pub use timer::{OneShotTimer, PeriodicTimer};
