//! osal-host
//!
//! Backend for desktop operating systems: threads over `std::thread`, the
//! blocking primitives over `parking_lot`. Priorities are kept as a logical
//! range (the host scheduler is not reprogrammed), mapped one-to-one and
//! monotonically onto themselves.

mod eventflag;
mod mutex;
mod pool;
mod thread;
mod timer;

pub use thread::HostThreadFactory;

use osal_core::registry;
use std::sync::{Arc, OnceLock};

static THREAD_FACTORY: OnceLock<Arc<HostThreadFactory>> = OnceLock::new();

/// Register every host factory. Call once at application init, before any
/// resource is created; calling again refreshes the priority range.
pub fn init(lowest_priority: i32, highest_priority: i32) {
    let threads = THREAD_FACTORY
        .get_or_init(|| Arc::new(HostThreadFactory::new(lowest_priority, highest_priority)));
    threads.set_priority_range(lowest_priority, highest_priority);

    registry::register_thread_factory(Arc::clone(threads) as Arc<dyn osal_core::thread::ThreadFactory>);
    registry::register_mutex_factory(Arc::new(mutex::HostMutexFactory));
    registry::register_event_flag_factory(Arc::new(eventflag::HostEventFlagFactory));
    registry::register_fixed_memory_pool_factory(Arc::new(pool::HostFixedMemoryPoolFactory));
    registry::register_variable_memory_pool_factory(Arc::new(pool::HostVariableMemoryPoolFactory));
    registry::register_fixed_allocator_factory(Arc::new(pool::HostFixedMemoryPoolFactory));
    registry::register_variable_allocator_factory(Arc::new(pool::HostVariableMemoryPoolFactory));
    registry::register_periodic_timer_factory(Arc::new(timer::HostPeriodicTimerFactory));
    registry::register_one_shot_timer_factory(Arc::new(timer::HostOneShotTimerFactory));
}

/// Reshape the logical priority range. Only meaningful before threads are
/// created; `highest` may be numerically below `lowest` (inverted mapping).
pub fn set_priority_range(lowest_priority: i32, highest_priority: i32) {
    if let Some(threads) = THREAD_FACTORY.get() {
        threads.set_priority_range(lowest_priority, highest_priority);
    }
}
