//! A hand-rolled [`RawWaker`] for [`super::RawTask`].
//!
//! This is the real-rescheduling counterpart to the upstream `dummy_waker`:
//! that one exists to poll a single top-level future and flips a thread-local
//! flag on wake rather than identifying which task woke. Spawned tasks need
//! more than a flag: waking one must put *that* task, specifically, back on
//! the run queue. The vtable below does that by round-tripping the task's
//! `Rc` strong count through the raw pointer `Waker` carries, the same
//! technique `std`'s own documentation for `RawWaker` recommends.

use std::rc::Rc;
use std::task::{RawWaker, RawWakerVTable, Waker};

use super::RawTask;

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop_raw);

unsafe fn clone(ptr: *const ()) -> RawWaker {
    Rc::increment_strong_count(ptr as *const RawTask);
    RawWaker::new(ptr, &VTABLE)
}

unsafe fn wake(ptr: *const ()) {
    let task = Rc::from_raw(ptr as *const RawTask);
    reschedule(task);
}

unsafe fn wake_by_ref(ptr: *const ()) {
    Rc::increment_strong_count(ptr as *const RawTask);
    let task = Rc::from_raw(ptr as *const RawTask);
    reschedule(task);
}

unsafe fn drop_raw(ptr: *const ()) {
    drop(Rc::from_raw(ptr as *const RawTask));
}

fn reschedule(raw: Rc<RawTask>) {
    crate::scheduler::schedule(super::Task(raw));
}

pub(crate) fn task_waker(raw: Rc<RawTask>) -> Waker {
    let ptr = Rc::into_raw(raw) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &VTABLE)) }
}
