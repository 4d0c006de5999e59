//! A tiny wall-clock timer facility.
//!
//! Upstream keeps a hashed timing wheel under `time/driver/{entry,wheel}.rs`
//! so that a runtime juggling thousands of concurrent sleeps stays O(1) per
//! tick. This executor never has more than a handful of pending sleeps (one
//! per cooperative task, and this crate spawns at most a few), so the wheel
//! buys nothing here: deadlines are kept in a flat `Vec` that
//! [`crate::runtime::Runtime::block_on`] scans once per wake to find the
//! next one due and to fire any that have matured.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

pub(crate) struct TimerEntry {
    pub(crate) deadline: Instant,
    pub(crate) waker: Waker,
}

#[derive(Default)]
pub(crate) struct TimerQueue {
    entries: std::cell::RefCell<Vec<TimerEntry>>,
}

impl TimerQueue {
    pub(crate) fn register(&self, deadline: Instant, waker: Waker) {
        self.entries
            .borrow_mut()
            .push(TimerEntry { deadline, waker });
    }

    /// Returns the soonest registered deadline, if any, without firing it.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.borrow().iter().map(|e| e.deadline).min()
    }

    /// Wakes (and removes) every entry whose deadline has passed.
    pub(crate) fn fire_due(&self, now: Instant) {
        let mut entries = self.entries.borrow_mut();
        let mut i = 0;
        while i < entries.len() {
            if entries[i].deadline <= now {
                let fired = entries.swap_remove(i);
                fired.waker.wake();
            } else {
                i += 1;
            }
        }
    }
}

/// A future that completes after `duration` has elapsed.
pub struct Sleep {
    deadline: Instant,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let now = Instant::now();
        if now >= self.deadline {
            return Poll::Ready(());
        }
        crate::runtime::CURRENT.with(|ctx| {
            ctx.timers.register(self.deadline, cx.waker().clone());
        });
        Poll::Pending
    }
}

/// Returns a future that completes after `duration` has elapsed.
///
/// Must be polled from within a [`crate::Runtime`]; like the rest of this
/// crate it is not `Send` and does not work across an executor boundary.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        deadline: Instant::now() + duration,
    }
}
