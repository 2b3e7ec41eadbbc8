//! queue.rs

use crate::error::{OsError, OsResult};
use crate::eventflag::{EventFlag, WaitMode};
use crate::timeout::{Deadline, Timeout};
use parking_lot::Mutex as PlMutex;
use std::collections::VecDeque;

const SIGNAL: usize = 0b1;

/// A bounded FIFO of `T`, safe under concurrent producers and consumers.
///
/// Blocking is built on two manual-reset [`EventFlag`]s, one signalling
/// not-empty and one not-full; the storage itself sits behind a plain lock.
/// `send` blocks (or times out) at capacity, `receive` when empty.
pub struct MessageQueue<T> {
    items: PlMutex<VecDeque<T>>,
    capacity: usize,
    not_empty: EventFlag,
    not_full: EventFlag,
}

impl<T: Send> MessageQueue<T> {
    /// Capacity is fixed at creation; zero yields `None`, as does failure to
    /// allocate the backing event flags.
    pub fn create(capacity: usize) -> Option<MessageQueue<T>> {
        if capacity == 0 {
            return None;
        }
        let not_empty = EventFlag::create(false)?;
        let not_full = EventFlag::create(false)?;
        not_full.set(SIGNAL).ok()?;
        Some(MessageQueue {
            items: PlMutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty,
            not_full,
        })
    }

    pub fn send(&self, item: T) -> Result<(), (OsError, T)> {
        self.timed_send(item, Timeout::Forever)
    }

    pub fn try_send(&self, item: T) -> Result<(), (OsError, T)> {
        self.timed_send(item, Timeout::Polling)
    }

    /// On failure the item travels back to the caller alongside the error.
    pub fn timed_send(&self, item: T, tmout: Timeout) -> Result<(), (OsError, T)> {
        let deadline = Deadline::start(tmout);
        let mut item = Some(item);
        loop {
            {
                let mut items = self.items.lock();
                if items.len() < self.capacity {
                    items.push_back(item.take().unwrap());
                    let _ = self.not_empty.set(SIGNAL);
                    return Ok(());
                }
                // Consume the stale signal while a sender cannot race us;
                // any pop after this point re-sets it.
                let _ = self.not_full.reset(SIGNAL);
            }
            if let Err(e) = self.not_full.timed_wait(SIGNAL, WaitMode::Or, deadline.remaining()) {
                return Err((e, item.take().unwrap()));
            }
        }
    }

    pub fn receive(&self) -> OsResult<T> {
        self.timed_receive(Timeout::Forever)
    }

    pub fn try_receive(&self) -> OsResult<T> {
        self.timed_receive(Timeout::Polling)
    }

    pub fn timed_receive(&self, tmout: Timeout) -> OsResult<T> {
        let deadline = Deadline::start(tmout);
        loop {
            {
                let mut items = self.items.lock();
                if let Some(item) = items.pop_front() {
                    let _ = self.not_full.set(SIGNAL);
                    if !items.is_empty() {
                        let _ = self.not_empty.set(SIGNAL);
                    }
                    return Ok(item);
                }
                let _ = self.not_empty.reset(SIGNAL);
            }
            self.not_empty
                .timed_wait(SIGNAL, WaitMode::Or, deadline.remaining())?;
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> std::fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("len", &self.items.lock().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
