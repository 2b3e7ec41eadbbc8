//! registry.rs
//!
//! One process-wide factory slot per resource kind. A backend crate fills
//! every slot from its `init()` helper before any resource is created;
//! re-registration is permitted but must not be used once resources exist.

use crate::eventflag::EventFlagFactory;
use crate::mutex::MutexFactory;
use crate::pool::{
    FixedAllocatorFactory, FixedMemoryPoolFactory, VariableAllocatorFactory,
    VariableMemoryPoolFactory,
};
use crate::thread::ThreadFactory;
use crate::timer::{OneShotTimerFactory, PeriodicTimerFactory};
use parking_lot::RwLock;
use std::sync::Arc;

/// A single registration slot.
///
/// Reading an empty slot is a precondition violation and aborts the process,
/// the way the original layer's contract assertions do.
pub struct FactoryCell<T: ?Sized> {
    kind: &'static str,
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> FactoryCell<T> {
    const fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slot: RwLock::new(None),
        }
    }

    pub fn register(&self, factory: Arc<T>) {
        *self.slot.write() = Some(factory);
    }

    pub fn is_registered(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The registered factory.
    ///
    /// # Panics
    ///
    /// Panics if no backend has registered a factory for this resource kind.
    pub fn get(&self) -> Arc<T> {
        match self.slot.read().as_ref() {
            Some(factory) => Arc::clone(factory),
            None => panic!("no {} factory registered", self.kind),
        }
    }
}

pub static THREAD_FACTORY: FactoryCell<dyn ThreadFactory> = FactoryCell::new("thread");
pub static MUTEX_FACTORY: FactoryCell<dyn MutexFactory> = FactoryCell::new("mutex");
pub static EVENT_FLAG_FACTORY: FactoryCell<dyn EventFlagFactory> = FactoryCell::new("event flag");
pub static FIXED_MEMORY_POOL_FACTORY: FactoryCell<dyn FixedMemoryPoolFactory> =
    FactoryCell::new("fixed memory pool");
pub static VARIABLE_MEMORY_POOL_FACTORY: FactoryCell<dyn VariableMemoryPoolFactory> =
    FactoryCell::new("variable memory pool");
pub static FIXED_ALLOCATOR_FACTORY: FactoryCell<dyn FixedAllocatorFactory> =
    FactoryCell::new("fixed allocator");
pub static VARIABLE_ALLOCATOR_FACTORY: FactoryCell<dyn VariableAllocatorFactory> =
    FactoryCell::new("variable allocator");
pub static PERIODIC_TIMER_FACTORY: FactoryCell<dyn PeriodicTimerFactory> =
    FactoryCell::new("periodic timer");
pub static ONE_SHOT_TIMER_FACTORY: FactoryCell<dyn OneShotTimerFactory> =
    FactoryCell::new("one-shot timer");

pub fn register_thread_factory(factory: Arc<dyn ThreadFactory>) {
    THREAD_FACTORY.register(factory);
}

pub fn register_mutex_factory(factory: Arc<dyn MutexFactory>) {
    MUTEX_FACTORY.register(factory);
}

pub fn register_event_flag_factory(factory: Arc<dyn EventFlagFactory>) {
    EVENT_FLAG_FACTORY.register(factory);
}

pub fn register_fixed_memory_pool_factory(factory: Arc<dyn FixedMemoryPoolFactory>) {
    FIXED_MEMORY_POOL_FACTORY.register(factory);
}

pub fn register_variable_memory_pool_factory(factory: Arc<dyn VariableMemoryPoolFactory>) {
    VARIABLE_MEMORY_POOL_FACTORY.register(factory);
}

pub fn register_fixed_allocator_factory(factory: Arc<dyn FixedAllocatorFactory>) {
    FIXED_ALLOCATOR_FACTORY.register(factory);
}

pub fn register_variable_allocator_factory(factory: Arc<dyn VariableAllocatorFactory>) {
    VARIABLE_ALLOCATOR_FACTORY.register(factory);
}

pub fn register_periodic_timer_factory(factory: Arc<dyn PeriodicTimerFactory>) {
    PERIODIC_TIMER_FACTORY.register(factory);
}

pub fn register_one_shot_timer_factory(factory: Arc<dyn OneShotTimerFactory>) {
    ONE_SHOT_TIMER_FACTORY.register(factory);
}
