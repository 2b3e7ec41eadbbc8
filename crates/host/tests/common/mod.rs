//! Shared fixtures for the backend integration tests.

#![allow(dead_code)]

use osal_core::runnable::UncaughtErrorHandler;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Mutex;

/// Registered factories with the conventional test range: priorities 1..=9,
/// 9 semantically highest, normal = 5.
pub fn init() {
    osal_host::init(1, 9);
}

/// Records every uncaught-failure delivery for later assertions.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl UncaughtErrorHandler for Recorder {
    fn handle(&self, thread_name: &str, message: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((thread_name.to_string(), message.to_string()));
    }
}

/// Tracks how many tasks run concurrently and the high-water mark.
#[derive(Default)]
pub struct Gauge {
    current: AtomicIsize,
    peak: AtomicIsize,
}

impl Gauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> isize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> isize {
        self.current.load(Ordering::SeqCst)
    }
}
