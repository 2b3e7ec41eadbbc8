//! Dispatch a batch of jobs over a small worker pool, watch a periodic
//! heartbeat tick alongside, and drain everything cleanly.
//!
//! ```console
//! cargo run --example workers
//! ```

use osal::core::{PeriodicTimer, Thread, ThreadPool, WaitGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    osal::host::init(1, 9);

    let heartbeat = PeriodicTimer::create(Arc::new(|| tracing::info!("tick")), 200, "heartbeat")
        .expect("heartbeat timer");
    heartbeat.start();

    let pool = ThreadPool::create_with(4, 0, Thread::normal_priority(), "worker")
        .expect("worker pool");
    let completed = Arc::new(AtomicUsize::new(0));

    let mut guards = Vec::new();
    for job in 0..16usize {
        let completed = Arc::clone(&completed);
        let task = Arc::new(move || {
            Thread::sleep(50);
            completed.fetch_add(1, Ordering::SeqCst);
            tracing::info!(job, "job finished");
        });
        let mut guard = WaitGuard::new();
        pool.start(task, Some(&mut guard), Thread::INHERIT_PRIORITY)
            .expect("dispatch");
        guards.push(guard);
    }

    for guard in &mut guards {
        guard.release();
    }
    heartbeat.stop();

    tracing::info!(completed = completed.load(Ordering::SeqCst), "all jobs drained");
}
