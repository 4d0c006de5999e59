//! The executor's parking strategy.
//!
//! Upstream, a `Driver` owns the io_uring/epoll submission queue and parking
//! means "block in the kernel until a completion is ready". This crate has
//! no kernel-backed I/O: the only reasons a parked control thread needs to
//! wake are "a timer matured" (handled by [`crate::runtime::Runtime::block_on`]
//! bounding the park with the next timer deadline) and "something called
//! `Unpark::unpark`" (a task's waker firing from outside the park call, which
//! cannot happen on a single thread with no cross-thread wakeups, but the
//! hook is kept because a future hardware-backed transport would plausibly
//! need to signal readiness from a reader thread).

use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Parks the calling thread until woken or a timeout elapses.
pub trait Driver {
    /// Blocks until [`Unpark::unpark`] is called.
    fn park(&self) -> io::Result<()>;

    /// Blocks until [`Unpark::unpark`] is called or `timeout` elapses,
    /// whichever comes first.
    fn park_timeout(&self, timeout: Duration) -> io::Result<()>;
}

struct Inner {
    lock: Mutex<bool>,
    condvar: Condvar,
}

/// A handle that can wake a parked [`ParkDriver`] from anywhere.
#[derive(Clone)]
pub struct Unpark {
    inner: Arc<Inner>,
}

impl Unpark {
    /// Wakes the driver if it is currently parked; otherwise arms the next
    /// `park`/`park_timeout` call to return immediately.
    pub fn unpark(&self) {
        let mut pending = self.inner.lock.lock().unwrap();
        *pending = true;
        self.inner.condvar.notify_one();
    }
}

/// The sole [`Driver`] implementation in this crate: a condvar-backed park,
/// with no kernel I/O of its own.
pub struct ParkDriver {
    inner: Arc<Inner>,
}

impl Default for ParkDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ParkDriver {
    /// Creates a new, unparked driver.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                lock: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Returns a cloneable handle that can unpark this driver.
    pub fn unpark_handle(&self) -> Unpark {
        Unpark {
            inner: self.inner.clone(),
        }
    }
}

impl Driver for ParkDriver {
    fn park(&self) -> io::Result<()> {
        let mut pending = self.inner.lock.lock().unwrap();
        while !*pending {
            pending = self.inner.condvar.wait(pending).unwrap();
        }
        *pending = false;
        Ok(())
    }

    fn park_timeout(&self, timeout: Duration) -> io::Result<()> {
        let mut pending = self.inner.lock.lock().unwrap();
        if !*pending {
            let (guard, _timed_out) = self.inner.condvar.wait_timeout(pending, timeout).unwrap();
            pending = guard;
        }
        *pending = false;
        Ok(())
    }
}
