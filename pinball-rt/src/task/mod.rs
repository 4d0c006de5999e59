//! A task is a boxed, pinned future plus enough bookkeeping to reschedule
//! itself onto the thread-local run queue when its waker fires.
//!
//! Unlike the upstream runtime this crate descends from, there is no
//! separately-allocated "cell" split into header/core/trailer and no raw
//! vtable-based polymorphism over the task state machine. Tasks here are
//! `!Send` by construction (`Rc`, `RefCell`), which matches this crate's
//! single-thread contract, and the extra machinery that buys cross-thread
//! wakeups and allocation-free state transitions is not needed for a
//! cooperative control loop with at most a handful of live tasks.

mod join;
mod waker;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Context;

pub use join::JoinHandle;
pub(crate) use join::bind;

type BoxedFuture = Pin<Box<dyn Future<Output = ()>>>;

/// The heap allocation shared between a task's waker clones and its run
/// queue entry.
pub(crate) struct RawTask {
    future: RefCell<Option<BoxedFuture>>,
}

/// A runnable unit of work. Cloning a `Task` is cheap (`Rc` bump); running
/// it polls the inner future exactly once.
#[derive(Clone)]
pub(crate) struct Task(Rc<RawTask>);

impl Task {
    /// Polls the inner future once. If it completes, the slot is cleared so
    /// the allocation can be dropped once the last waker clone goes away.
    pub(crate) fn run(self) {
        let waker = waker::task_waker(self.0.clone());
        let mut cx = Context::from_waker(&waker);

        // Borrow scope must not overlap with dropping the completed future,
        // since dropping a future can itself spawn or wake tasks that touch
        // this same `RefCell` only if it re-enters `run` for *this* task,
        // which cannot happen: nothing holds a second `Rc` to this cell that
        // would run it reentrantly while we hold the borrow.
        let mut slot = self.0.future.borrow_mut();
        let Some(fut) = slot.as_mut() else {
            // Woken after completion (a stale waker fired); nothing to do.
            return;
        };
        if fut.as_mut().poll(&mut cx).is_ready() {
            *slot = None;
        }
    }
}

/// Boxes and pins `future`, returning a runnable [`Task`] handle.
pub(crate) fn new_task<F>(future: F) -> Task
where
    F: Future<Output = ()> + 'static,
{
    Task(Rc::new(RawTask {
        future: RefCell::new(Some(Box::pin(future))),
    }))
}
