use std::future::Future;
use std::task::Poll;
use std::time::Instant;

use crate::driver::Driver;
use crate::scheduler::TaskQueue;
use crate::task::{new_task, JoinHandle};
use crate::time::TimerQueue;

scoped_thread_local!(pub(crate) static CURRENT: Context);

pub(crate) struct Context {
    pub(crate) tasks: TaskQueue,
    pub(crate) timers: TimerQueue,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            tasks: TaskQueue::default(),
            timers: TimerQueue::default(),
        }
    }
}

/// The executor. Owns exactly one driver and one thread-local [`Context`].
pub struct Runtime<D> {
    driver: D,
    context: Context,
}

impl<D> Runtime<D> {
    pub(crate) fn new(driver: D) -> Self {
        Self {
            driver,
            context: Context::new(),
        }
    }

    /// Drives `future` to completion, running any tasks [`spawn`]ed from
    /// inside it (or from each other) cooperatively alongside it.
    pub fn block_on<F>(&mut self, future: F) -> F::Output
    where
        F: Future,
        D: Driver,
    {
        assert!(
            !CURRENT.is_set(),
            "cannot start a pinball-rt runtime inside another one"
        );

        CURRENT.set(&self.context, || {
            let mut join = std::pin::pin!(future);

            // A no-op waker for the top-level future: it has nowhere else to
            // be rescheduled to, so waking it just means "try polling again
            // next time around the loop", which the loop already does.
            let waker = noop_waker();
            let cx = &mut std::task::Context::from_waker(&waker);

            loop {
                loop {
                    // Bound how many tasks we run before checking the main
                    // future again, in case a task keeps rescheduling itself.
                    let mut budget = self.context.tasks.len() * 2 + 1;
                    while let Some(t) = self.context.tasks.pop() {
                        t.run();
                        budget -= 1;
                        if budget == 0 {
                            break;
                        }
                    }

                    if let Poll::Ready(out) = join.as_mut().poll(cx) {
                        return out;
                    }

                    if !self.context.tasks.is_empty() {
                        // More work queued while draining; loop without parking.
                        continue;
                    }
                    break;
                }

                match self.context.timers.next_deadline() {
                    Some(deadline) => {
                        let now = Instant::now();
                        if deadline <= now {
                            self.context.timers.fire_due(now);
                            continue;
                        }
                        let _ = self.driver.park_timeout(deadline - now);
                        self.context.timers.fire_due(Instant::now());
                    }
                    None => {
                        let _ = self.driver.park();
                    }
                }
            }
        })
    }
}

fn noop_waker() -> std::task::Waker {
    use std::task::{RawWaker, RawWakerVTable, Waker};
    fn clone(_: *const ()) -> RawWaker {
        raw()
    }
    fn no_op(_: *const ()) {}
    fn raw() -> RawWaker {
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }
    unsafe { Waker::from_raw(raw()) }
}

/// Spawns `future` onto the current runtime's task queue, returning a
/// [`JoinHandle`] for its eventual output.
///
/// Must be called from within a [`Runtime::block_on`] call, directly or from
/// a task it is already running.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    let (driver_future, handle) = crate::task::bind(future);
    let task = new_task(driver_future);
    CURRENT.with(|ctx| ctx.tasks.push(task));
    handle
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[test]
    fn block_on_returns_value() {
        let mut rt = crate::RuntimeBuilder::new().build().unwrap();
        let out = rt.block_on(async { 1 + 1 });
        assert_eq!(out, 2);
    }

    #[test]
    fn spawned_task_runs_to_completion() {
        let mut rt = crate::RuntimeBuilder::new().build().unwrap();
        let ran = Rc::new(Cell::new(false));
        let ran2 = ran.clone();
        rt.block_on(async move {
            let handle = crate::spawn(async move {
                ran2.set(true);
                7
            });
            assert_eq!(handle.await, 7);
        });
        assert!(ran.get());
    }

    #[test]
    fn sleep_wakes_after_duration() {
        let mut rt = crate::RuntimeBuilder::new().build().unwrap();
        let start = std::time::Instant::now();
        rt.block_on(async {
            crate::sleep(Duration::from_millis(20)).await;
        });
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    #[should_panic(expected = "cannot start a pinball-rt runtime inside another one")]
    fn nested_block_on_panics() {
        let mut rt = crate::RuntimeBuilder::new().build().unwrap();
        rt.block_on(async {
            let mut inner = crate::RuntimeBuilder::new().build().unwrap();
            inner.block_on(async {});
        });
    }
}
