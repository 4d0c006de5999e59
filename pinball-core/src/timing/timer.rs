/// A discrete tick of the global clock. Monotonically increasing, zero at
/// startup.
pub type Tick = u64;

/// A callback scheduled against the tick clock.
///
/// A `Timer` fires once `delay_ticks` after it is added; if `frequency_ticks`
/// is set it then reschedules itself that many ticks later, indefinitely.
/// If `frequency_ticks` is absent the timer is one-shot and is dropped from
/// the service once it fires.
pub struct Timer {
    pub(crate) callback: Box<dyn FnMut()>,
    pub(crate) delay_ticks: u64,
    pub(crate) frequency_ticks: Option<u64>,
    pub(crate) wakeup_tick: Option<Tick>,
}

impl Timer {
    /// A timer that fires exactly once, `delay_ticks` after being added.
    pub fn once<F>(delay_ticks: u64, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self {
            callback: Box::new(callback),
            delay_ticks,
            frequency_ticks: None,
            wakeup_tick: None,
        }
    }

    /// A timer that fires every `frequency_ticks`, starting `frequency_ticks`
    /// after being added.
    pub fn periodic<F>(frequency_ticks: u64, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Self {
            callback: Box::new(callback),
            delay_ticks: frequency_ticks,
            frequency_ticks: Some(frequency_ticks),
            wakeup_tick: None,
        }
    }
}

/// An opaque handle to a [`Timer`] registered with a `TimingService`, used
/// to remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);
