//! The switch controller.
//!
//! Grounded on `mpf.system.switch_controller.SwitchController`, with two
//! deliberate deviations from the original's behaviour (see `DESIGN.md` and
//! `SPEC_FULL.md` §9): the cancellation sweep removes only the matching
//! `(switch, opposite_state)` pending fires instead of an entire tick
//! bucket, and `last_change_tick` only advances on an actual transition
//! instead of on every report.

mod switch;

pub use switch::{Switch, SwitchType};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::events::EventBus;
use crate::timing::{Tick, TimingService};

type Callback = Rc<dyn Fn()>;

struct HandlerRegistration {
    dwell_ticks: u64,
    callback: Callback,
}

struct PendingFire {
    switch_name: String,
    target_state: u8,
    callback: Callback,
}

/// Ingests raw switch transitions, tracks per-switch dwell time, and
/// dispatches immediate and delayed handlers plus tag-derived events.
pub struct SwitchController {
    timing: Rc<RefCell<TimingService>>,
    events: Rc<RefCell<EventBus>>,
    switches: HashMap<String, Switch>,
    registered_switches: HashMap<(String, u8), Vec<HandlerRegistration>>,
    active_timed_switches: HashMap<Tick, Vec<PendingFire>>,
}

impl SwitchController {
    /// Creates a controller sharing the given timing service and event bus
    /// handles with the rest of the machine.
    pub fn new(timing: Rc<RefCell<TimingService>>, events: Rc<RefCell<EventBus>>) -> Self {
        Self {
            timing,
            events,
            switches: HashMap::new(),
            registered_switches: HashMap::new(),
            active_timed_switches: HashMap::new(),
        }
    }

    /// Declares a switch so it can subsequently be driven by
    /// [`Self::process_switch`]. Must happen before
    /// [`Self::initialize_hw_states`].
    pub fn add_switch(&mut self, switch: Switch) {
        self.switches.insert(switch.name.clone(), switch);
    }

    /// Returns true if `name` has been declared via [`Self::add_switch`].
    pub fn is_registered(&self, name: &str) -> bool {
        self.switches.contains_key(name)
    }

    /// Feeds each declared switch's initial hardware reading through
    /// [`Self::process_switch`]. Must run exactly once, after all switches
    /// have been declared and before any other hardware event arrives.
    pub fn initialize_hw_states(&mut self, initial_raw_states: &HashMap<String, u8>) -> Result<()> {
        let names: Vec<String> = self.switches.keys().cloned().collect();
        for name in names {
            let raw = *initial_raw_states.get(&name).unwrap_or(&0);
            self.process_switch(&name, raw, false)?;
        }
        Ok(())
    }

    /// Canonical ingress from the platform driver: `raw_state` is the
    /// hardware's reading unless `logical` is true, in which case it is
    /// already the post-inversion value.
    pub fn process_switch(&mut self, name: &str, raw_state: u8, logical: bool) -> Result<()> {
        let current_tick = self.timing.borrow().current_tick();

        let Some(switch) = self.switches.get_mut(name) else {
            warn!(switch = name, "process_switch for unregistered switch, dropping");
            return Ok(());
        };

        let new_state = if logical {
            raw_state
        } else {
            switch.to_logical(raw_state)
        };

        let changed = switch.state != new_state;
        if changed {
            switch.state = new_state;
            switch.last_change_tick = current_tick;
            debug!(switch = name, state = new_state, tick = current_tick, "switch transition");
        }

        // Immediate and dwell-delayed handlers fire on every report at the
        // target state, not only on an actual transition: a handler
        // registered for state 1 should still run if the platform reports
        // "still active" while the controller's own bookkeeping only moves
        // `last_change_tick` on a real flip.
        if let Some(registrations) = self.registered_switches.get(&(name.to_string(), new_state)) {
            for reg in registrations {
                if reg.dwell_ticks == 0 {
                    (reg.callback)();
                } else {
                    let fire_tick = current_tick + reg.dwell_ticks;
                    self.active_timed_switches.entry(fire_tick).or_default().push(PendingFire {
                        switch_name: name.to_string(),
                        target_state: new_state,
                        callback: reg.callback.clone(),
                    });
                }
            }
        }

        // Cancel any pending fire for this switch at the opposite state.
        // Only matching entries are removed; unrelated pending fires that
        // happen to share a fire tick are left untouched (see module docs).
        let opposite = 1 - new_state;
        for bucket in self.active_timed_switches.values_mut() {
            bucket.retain(|pf| !(pf.switch_name == name && pf.target_state == opposite));
        }
        self.active_timed_switches.retain(|_, bucket| !bucket.is_empty());

        if new_state == 1 {
            if let Some(switch) = self.switches.get(name) {
                let tags: Vec<String> = switch.tags.iter().cloned().collect();
                for tag in tags {
                    self.events.borrow_mut().post(&format!("sw_{tag}"));
                }
            }
        }

        Ok(())
    }

    /// Registers a handler that fires when `switch_name` reaches `state` and
    /// remains there for `ms` milliseconds (0 for an immediate fire).
    pub fn add_switch_handler<F>(
        &mut self,
        switch_name: &str,
        state: u8,
        ms: u64,
        callback: F,
    ) -> Result<()>
    where
        F: Fn() + 'static,
    {
        if !self.switches.contains_key(switch_name) {
            return Err(CoreError::Misconfigured(format!(
                "cannot register a handler for undeclared switch {switch_name:?}"
            )));
        }
        let dwell_ticks = if ms == 0 {
            0
        } else {
            self.timing.borrow().msecs_ceil(ms)?
        };
        debug!(switch = switch_name, state, ms, "switch handler registered");
        self.registered_switches
            .entry((switch_name.to_string(), state))
            .or_default()
            .push(HandlerRegistration {
                dwell_ticks,
                callback: Rc::new(callback),
            });
        Ok(())
    }

    /// Removes every handler registered for `(switch_name, state)`.
    pub fn remove_switch_handler(&mut self, switch_name: &str, state: u8) {
        self.registered_switches.remove(&(switch_name.to_string(), state));
    }

    /// True if `switch_name` is currently in `state` and has been for at
    /// least `ticks` ticks.
    pub fn is_state(&self, switch_name: &str, state: u8, ticks: u64) -> bool {
        let Some(switch) = self.switches.get(switch_name) else {
            return false;
        };
        if switch.state != state {
            return false;
        }
        self.ticks_since_change(switch_name) >= ticks
    }

    /// Sugar for `is_state(name, 1, ticks)`.
    pub fn is_active(&self, switch_name: &str, ticks: u64) -> bool {
        self.is_state(switch_name, 1, ticks)
    }

    /// Sugar for `is_state(name, 0, ticks)`.
    pub fn is_inactive(&self, switch_name: &str, ticks: u64) -> bool {
        self.is_state(switch_name, 0, ticks)
    }

    /// Ticks elapsed since `switch_name`'s logical state last changed, or 0
    /// if the switch is unknown.
    pub fn ticks_since_change(&self, switch_name: &str) -> u64 {
        let Some(switch) = self.switches.get(switch_name) else {
            return 0;
        };
        self.timing.borrow().current_tick() - switch.last_change_tick
    }

    /// Invoked once per tick by the timing service: fires every pending
    /// delayed handler whose fire tick has matured, then clears those
    /// buckets. Tolerant of handlers that (indirectly) touch the pending-fire
    /// map, since the fired buckets are removed before any callback runs.
    pub fn tick_hook(&mut self) {
        let current_tick = self.timing.borrow().current_tick();
        let due: Vec<Tick> = self
            .active_timed_switches
            .keys()
            .copied()
            .filter(|tick| *tick <= current_tick)
            .collect();

        for tick in due {
            if let Some(bucket) = self.active_timed_switches.remove(&tick) {
                for pf in bucket {
                    (pf.callback)();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn controller_with_hz(hz: u32) -> (SwitchController, Rc<RefCell<TimingService>>, Rc<RefCell<EventBus>>) {
        let mut timing = TimingService::new();
        timing.configure(hz).unwrap();
        let timing = Rc::new(RefCell::new(timing));
        let events = Rc::new(RefCell::new(EventBus::new()));
        let controller = SwitchController::new(timing.clone(), events.clone());
        (controller, timing, events)
    }

    fn tick_n(controller: &mut SwitchController, timing: &Rc<RefCell<TimingService>>, n: u64) {
        for _ in 0..n {
            timing.borrow_mut().tick();
            controller.tick_hook();
        }
    }

    #[test]
    fn nc_switch_inverts_raw_state() {
        let (mut controller, _timing, _events) = controller_with_hz(50);
        controller.add_switch(Switch::new("s", "1", SwitchType::NormallyClosed, []));
        controller.process_switch("s", 1, false).unwrap();
        assert!(controller.is_state("s", 0, 0));
    }

    #[test]
    fn delayed_handler_fires_after_dwell() {
        let (mut controller, timing, _events) = controller_with_hz(50);
        controller.add_switch(Switch::new("s", "1", SwitchType::NormallyOpen, []));
        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        controller
            .add_switch_handler("s", 1, 100, move || fired2.set(true))
            .unwrap();
        controller.process_switch("s", 1, false).unwrap();

        tick_n(&mut controller, &timing, 4);
        assert!(!fired.get());
        tick_n(&mut controller, &timing, 1);
        assert!(fired.get());
    }

    #[test]
    fn leaving_target_state_cancels_pending_fire() {
        let (mut controller, timing, _events) = controller_with_hz(50);
        controller.add_switch(Switch::new("s", "1", SwitchType::NormallyOpen, []));
        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        controller
            .add_switch_handler("s", 1, 100, move || fired2.set(true))
            .unwrap();
        controller.process_switch("s", 1, false).unwrap();

        tick_n(&mut controller, &timing, 3);
        controller.process_switch("s", 0, false).unwrap();
        tick_n(&mut controller, &timing, 5);
        assert!(!fired.get());
    }

    #[test]
    fn cancellation_does_not_cross_switches_sharing_a_fire_tick() {
        let (mut controller, timing, _events) = controller_with_hz(50);
        controller.add_switch(Switch::new("a", "1", SwitchType::NormallyOpen, []));
        controller.add_switch(Switch::new("b", "2", SwitchType::NormallyOpen, []));

        let a_fired = Rc::new(Cell::new(false));
        let a2 = a_fired.clone();
        controller.add_switch_handler("a", 1, 100, move || a2.set(true)).unwrap();
        let b_fired = Rc::new(Cell::new(false));
        let b2 = b_fired.clone();
        controller.add_switch_handler("b", 1, 100, move || b2.set(true)).unwrap();

        controller.process_switch("a", 1, false).unwrap();
        controller.process_switch("b", 1, false).unwrap();

        tick_n(&mut controller, &timing, 3);
        controller.process_switch("a", 0, false).unwrap();
        tick_n(&mut controller, &timing, 5);

        assert!(!a_fired.get());
        assert!(b_fired.get());
    }

    #[test]
    fn tag_event_posted_only_on_activation() {
        let (mut controller, _timing, events) = controller_with_hz(50);
        controller.add_switch(Switch::new(
            "s",
            "1",
            SwitchType::NormallyOpen,
            ["left_flipper".to_string()],
        ));
        let seen = Rc::new(Cell::new(0));
        let seen2 = seen.clone();
        events.borrow_mut().add_handler("sw_left_flipper", 0, move |_| {
            seen2.set(seen2.get() + 1);
        });

        controller.process_switch("s", 1, false).unwrap();
        controller.process_switch("s", 0, false).unwrap();
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn unknown_switch_is_logged_and_dropped() {
        let (mut controller, _timing, _events) = controller_with_hz(50);
        assert!(controller.process_switch("ghost", 1, false).is_ok());
    }

    #[test]
    fn ticks_since_change_resets_on_transition() {
        let (mut controller, timing, _events) = controller_with_hz(50);
        controller.add_switch(Switch::new("s", "1", SwitchType::NormallyOpen, []));
        controller.process_switch("s", 1, false).unwrap();
        tick_n(&mut controller, &timing, 10);
        assert_eq!(controller.ticks_since_change("s"), 10);
        controller.process_switch("s", 0, false).unwrap();
        assert_eq!(controller.ticks_since_change("s"), 0);
    }

    #[test]
    fn add_switch_handler_rejects_undeclared_switch() {
        let (mut controller, _timing, _events) = controller_with_hz(50);
        assert!(controller.add_switch_handler("ghost", 1, 0, || {}).is_err());
    }
}
