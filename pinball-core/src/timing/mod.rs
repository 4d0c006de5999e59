//! The tick-driven timing service.
//!
//! Grounded directly on `mpf.system.timing.Timing`: a class-level tick
//! counter, a flat set of timers scanned in full on every tick, and string
//! parsing for `"200ms"`/`"2s"`/`"2"` duration literals. No hashed timing
//! wheel: a pinball machine runs a handful of periodic timers, not the
//! tens of thousands a wheel earns its complexity for.

mod timer;

pub use timer::{Tick, Timer, TimerHandle};

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{CoreError, Result};

/// Owns the tick counter and the set of active timers.
pub struct TimingService {
    hz: Option<u32>,
    secs_per_tick: f64,
    current_tick: Tick,
    timers: HashMap<u64, Timer>,
    next_id: u64,
}

impl Default for TimingService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingService {
    /// Creates an unconfigured service. [`Self::configure`] must be called
    /// before any timer is added.
    pub fn new() -> Self {
        Self {
            hz: None,
            secs_per_tick: 0.0,
            current_tick: 0,
            timers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Sets the tick rate. Idempotent when called repeatedly with the same
    /// value; a second call with a different value is a configuration error.
    pub fn configure(&mut self, hz: u32) -> Result<()> {
        if hz == 0 {
            return Err(CoreError::Misconfigured(
                "tick rate (HZ) must be greater than zero".into(),
            ));
        }
        if let Some(existing) = self.hz {
            if existing != hz {
                return Err(CoreError::Misconfigured(format!(
                    "timing service already configured at {existing} Hz, cannot reconfigure to {hz} Hz"
                )));
            }
            return Ok(());
        }
        debug!(hz, "timing service configured");
        self.hz = Some(hz);
        self.secs_per_tick = 1.0 / hz as f64;
        Ok(())
    }

    /// The number of ticks elapsed since startup.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// The configured tick rate, if any.
    pub fn hz(&self) -> Option<u32> {
        self.hz
    }

    fn require_hz(&self) -> Result<u32> {
        self.hz.ok_or_else(|| {
            CoreError::Misconfigured("timing service used before configure(hz) was called".into())
        })
    }

    /// Registers `timer`, returning a handle that can later be passed to
    /// [`Self::remove`].
    pub fn add(&mut self, mut timer: Timer) -> Result<TimerHandle> {
        self.require_hz()?;
        timer.wakeup_tick = Some(self.current_tick + timer.delay_ticks);
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert(id, timer);
        Ok(TimerHandle(id))
    }

    /// Removes a timer. A no-op if `handle` does not (or no longer) refer to
    /// a live timer.
    pub fn remove(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }

    /// Advances the clock by one tick and fires every timer whose wakeup has
    /// matured. A timer added from inside another timer's callback during
    /// this call does not fire until a later tick, since it is only visible
    /// in the snapshot of ids taken at the top of this call.
    pub fn tick(&mut self) {
        self.current_tick += 1;
        let due: Vec<u64> = self
            .timers
            .iter()
            .filter(|(_, t)| t.wakeup_tick.is_some_and(|w| w <= self.current_tick))
            .map(|(id, _)| *id)
            .collect();

        for id in due {
            let Some(timer) = self.timers.get_mut(&id) else {
                continue;
            };
            (timer.callback)();
            match timer.frequency_ticks {
                Some(freq) => {
                    if let Some(w) = timer.wakeup_tick.as_mut() {
                        *w += freq;
                    }
                }
                None => {
                    self.timers.remove(&id);
                }
            }
        }

        if self.timers.len() > 0 {
            trace!(tick = self.current_tick, active_timers = self.timers.len());
        }
    }

    /// Converts milliseconds to ticks, rounding toward zero.
    pub fn msecs(&self, ms: u64) -> Result<u64> {
        let hz = self.require_hz()?;
        Ok(ms * hz as u64 / 1000)
    }

    /// Converts milliseconds to ticks, rounding up. Used where a caller must
    /// never be scheduled to fire earlier than requested (see
    /// `SwitchController::add_switch_handler`).
    pub fn msecs_ceil(&self, ms: u64) -> Result<u64> {
        let hz = self.require_hz()?;
        Ok((ms * hz as u64).div_ceil(1000))
    }

    /// Converts seconds to ticks, rounding toward zero.
    pub fn secs(&self, s: u64) -> Result<u64> {
        let hz = self.require_hz()?;
        Ok(s * hz as u64)
    }

    /// Parses a duration literal: `"200ms"`/`"200msec"` as milliseconds,
    /// `"2s"` or a bare `"2"` as seconds.
    pub fn parse_duration(&self, spec: &str) -> Result<u64> {
        let spec = spec.trim();
        if let Some(ms) = spec.strip_suffix("msec") {
            return self.msecs(parse_number(ms)?);
        }
        if let Some(ms) = spec.strip_suffix("ms") {
            return self.msecs(parse_number(ms)?);
        }
        if let Some(s) = spec.strip_suffix('s') {
            return self.secs(parse_number(s)?);
        }
        self.secs(parse_number(spec)?)
    }
}

fn parse_number(s: &str) -> Result<u64> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| CoreError::Misconfigured(format!("invalid duration literal: {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn configure_rejects_zero_hz() {
        let mut svc = TimingService::new();
        assert!(svc.configure(0).is_err());
    }

    #[test]
    fn configure_is_idempotent_for_same_value() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        svc.configure(50).unwrap();
        assert!(svc.configure(60).is_err());
    }

    #[test]
    fn periodic_timer_fires_every_frequency_ticks() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        svc.add(Timer::periodic(5, move || count2.set(count2.get() + 1)))
            .unwrap();
        for _ in 0..15 {
            svc.tick();
        }
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn one_shot_timer_fires_once_then_is_dropped() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        svc.add(Timer::once(5, move || count2.set(count2.get() + 1)))
            .unwrap();
        for _ in 0..20 {
            svc.tick();
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn removed_timer_does_not_fire() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        let count = Rc::new(Cell::new(0));
        let count2 = count.clone();
        let handle = svc.add(Timer::once(5, move || count2.set(count2.get() + 1))).unwrap();
        svc.remove(handle);
        for _ in 0..10 {
            svc.tick();
        }
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn parse_duration_matches_explicit_conversions() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        assert_eq!(svc.parse_duration("200ms").unwrap(), svc.msecs(200).unwrap());
        assert_eq!(svc.parse_duration("2s").unwrap(), svc.secs(2).unwrap());
        assert_eq!(svc.parse_duration("2").unwrap(), svc.secs(2).unwrap());
    }

    #[test]
    fn zero_delay_timer_fires_on_first_tick() {
        let mut svc = TimingService::new();
        svc.configure(50).unwrap();
        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        svc.add(Timer::once(0, move || fired2.set(true))).unwrap();
        assert!(!fired.get());
        svc.tick();
        assert!(fired.get());
    }
}
