//! A single-producer, single-consumer byte queue for wiring a
//! [`super::SimulatedTransport`] to whatever feeds it bytes (a test, or the
//! CLI demo's stdin reader task).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct Inner {
    queue: RefCell<VecDeque<u8>>,
    waker: RefCell<Option<Waker>>,
}

/// The producer half. Cheap to clone; all clones feed the same queue.
#[derive(Clone)]
pub struct ByteSender {
    inner: Rc<Inner>,
}

impl ByteSender {
    /// Pushes one byte, waking a pending reader if one is parked.
    pub fn send(&self, byte: u8) {
        self.inner.queue.borrow_mut().push_back(byte);
        if let Some(waker) = self.inner.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    /// Pushes every byte of `bytes` in order.
    pub fn send_slice(&self, bytes: &[u8]) {
        for &b in bytes {
            self.send(b);
        }
    }
}

/// The consumer half.
pub struct ByteReceiver {
    inner: Rc<Inner>,
}

impl ByteReceiver {
    /// Returns a future resolving to the next byte once available.
    pub fn read_byte(&self) -> ReadByte {
        ReadByte {
            inner: self.inner.clone(),
        }
    }
}

/// The future returned by [`ByteReceiver::read_byte`].
pub struct ReadByte {
    inner: Rc<Inner>,
}

impl Future for ReadByte {
    type Output = u8;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<u8> {
        if let Some(byte) = self.inner.queue.borrow_mut().pop_front() {
            return Poll::Ready(byte);
        }
        *self.inner.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Creates a connected sender/receiver pair.
pub fn byte_channel() -> (ByteSender, ByteReceiver) {
    let inner = Rc::new(Inner {
        queue: RefCell::new(VecDeque::new()),
        waker: RefCell::new(None),
    });
    (
        ByteSender {
            inner: inner.clone(),
        },
        ByteReceiver { inner },
    )
}
