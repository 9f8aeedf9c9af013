//! Start synchronization shared by every thread of one test run.
//!
//! Senders block in [`StartBarrier::wait_until_on`] until either an external
//! sync thread or the receiver's first accepted connection turns the barrier
//! on, then poll [`StartBarrier::is_on`] once per write to learn when the
//! orchestrator ends the test.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    on: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

/// A cloneable handle to one run's start flag.
///
/// # Examples
///
/// ```
/// use rntttcp::StartBarrier;
/// use std::thread;
///
/// let barrier = StartBarrier::new();
/// let waiter = barrier.clone();
///
/// let handle = thread::spawn(move || {
///     waiter.wait_until_on();
///     waiter.is_on()
/// });
///
/// barrier.turn_on();
/// assert!(handle.join().unwrap());
/// ```
#[derive(Clone)]
pub struct StartBarrier {
    inner: Arc<Inner>,
}

impl StartBarrier {
    /// Creates a barrier in the OFF state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                on: AtomicBool::new(false),
                lock: Mutex::new(()),
                cond: Condvar::new(),
            }),
        }
    }

    /// Non-blocking peek at the flag.
    pub fn is_on(&self) -> bool {
        self.inner.on.load(Ordering::Acquire)
    }

    /// Turns the flag on and wakes every waiter.
    pub fn turn_on(&self) {
        {
            let _guard = self.inner.lock.lock();
            self.inner.on.store(true, Ordering::Release);
        }
        self.inner.cond.notify_all();
    }

    /// Turns the flag off. Senders exit their streaming loop on their next
    /// iteration.
    pub fn turn_off(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.on.store(false, Ordering::Release);
    }

    /// Blocks until the flag is on.
    pub fn wait_until_on(&self) {
        if self.is_on() {
            return;
        }

        let mut guard = self.inner.lock.lock();
        while !self.is_on() {
            self.inner.cond.wait(&mut guard);
        }
    }

    /// Blocks until the flag is on or `timeout` elapses.
    ///
    /// Returns the flag's state on return.
    pub fn wait_until_on_timeout(&self, timeout: Duration) -> bool {
        if self.is_on() {
            return true;
        }

        let mut guard = self.inner.lock.lock();
        let deadline = std::time::Instant::now() + timeout;
        while !self.is_on() {
            if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_on();
            }
        }
        true
    }
}

impl Default for StartBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StartBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartBarrier")
            .field("on", &self.is_on())
            .finish()
    }
}
