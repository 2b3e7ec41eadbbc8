//! osal
//!
//! Umbrella crate: the portable API surface plus the host backend. Call
//! [`host::init`] once at startup, then create resources through the core
//! types.
//!
//! ```no_run
//! use osal::core::{Thread, ThreadPool, WaitGuard};
//! use std::sync::Arc;
//!
//! osal::host::init(1, 9);
//! let pool = ThreadPool::create(4).unwrap();
//! let mut done = WaitGuard::new();
//! pool.start(Arc::new(|| println!("hello")), Some(&mut done), Thread::INHERIT_PRIORITY)
//!     .unwrap();
//! done.release();
//! ```

pub use osal_core as core;
pub use osal_host as host;
