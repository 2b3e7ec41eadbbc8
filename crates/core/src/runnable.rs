//! runnable.rs

/// A caller-supplied unit of work.
///
/// Ownership stays with the caller: resources take `Arc<dyn Runnable>` so the
/// work object outlives its execution without transferring ownership into the
/// layer.
pub trait Runnable: Send + Sync {
    fn run(&self);
}

impl<F> Runnable for F
where
    F: Fn() + Send + Sync,
{
    fn run(&self) {
        (self)()
    }
}

/// Receives failures that escape a [`Runnable`].
///
/// A panic propagating out of `run()` is caught by the thread entry wrapper,
/// rendered as a message string, and delivered here. Implementations must not
/// panic in turn.
pub trait UncaughtErrorHandler: Send + Sync {
    fn handle(&self, thread_name: &str, message: &str);
}
