//! A minimal, single-threaded cooperative task executor.
//!
//! `pinball-rt` is deliberately small: it exists to run exactly one kind of
//! workload, the pinball control loop and its serial-transport collaborator,
//! interleaved on a single OS thread. It has no file I/O, no network I/O, and
//! no cross-thread wakeups; `Task`s are `!Send` and the executor will refuse
//! to nest.
//!
//! The shape is borrowed from thread-per-core `async` runtimes: a
//! thread-local run queue, a `block_on` loop that drains ready tasks before
//! parking, and a `spawn` that hands a boxed future to that queue. What is
//! missing on purpose is everything those runtimes need for real I/O
//! (io_uring submission, buffer ownership passing, a reactor): this crate's
//! only source of "the future became ready" is a task waking itself or
//! another task through the ordinary `Waker` contract.

#[macro_use]
mod macros;

mod driver;
mod runtime;
mod scheduler;
mod task;
mod time;

pub use driver::{Driver, ParkDriver, Unpark};
pub use runtime::{spawn, Runtime};
pub use task::JoinHandle;
pub use time::{sleep, Sleep};

/// Builds a [`Runtime`].
///
/// There is exactly one driver in this crate ([`ParkDriver`]), so the
/// builder's only real job is to give callers a stable, teacher-shaped entry
/// point (`RuntimeBuilder::new().build()`) instead of constructing
/// `Runtime` fields directly.
pub struct RuntimeBuilder {
    _private: (),
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a new builder with the default (and only) driver.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Builds the runtime.
    pub fn build(self) -> std::io::Result<Runtime<ParkDriver>> {
        Ok(Runtime::new(ParkDriver::new()))
    }
}
