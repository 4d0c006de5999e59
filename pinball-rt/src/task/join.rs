use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct Shared<T> {
    value: Option<T>,
    waker: Option<Waker>,
}

/// A handle to a spawned task's eventual output.
///
/// Dropping a `JoinHandle` does not cancel the task; it keeps running
/// detached, matching the upstream runtime this is descended from.
pub struct JoinHandle<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut shared = self.shared.borrow_mut();
        if let Some(value) = shared.value.take() {
            return Poll::Ready(value);
        }
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Wraps `future` so that, on completion, its output is stashed for the
/// returned [`JoinHandle`] and any waiting waker is woken. Returns the
/// wrapped future to be driven by [`super::new_task`] and the `JoinHandle`
/// to hand back to the caller of `spawn`.
pub(crate) fn bind<F>(future: F) -> (impl Future<Output = ()>, JoinHandle<F::Output>)
where
    F: Future,
{
    let shared = Rc::new(RefCell::new(Shared {
        value: None,
        waker: None,
    }));
    let handle = JoinHandle {
        shared: shared.clone(),
    };
    let driver = async move {
        let value = future.await;
        let waker = {
            let mut shared = shared.borrow_mut();
            shared.value = Some(value);
            shared.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    };
    (driver, handle)
}
