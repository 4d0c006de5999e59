//! A thin, synchronous publish/subscribe bus.
//!
//! The switch controller and accelerometer processor only need "announce
//! this named thing happened, in priority order, before returning" - nothing
//! in this crate needs the bus to cross a thread or outlive the call that
//! posted to it. Priority-ordered dispatch mirrors the collaborator contract
//! in use: handlers registered with a higher priority run first.

use std::collections::HashMap;

/// A loosely-typed payload attached to a posted event. Real payloads in this
/// domain are small (a handful of named numeric fields, e.g. tilt angles),
/// so a map is enough; nothing here needs arbitrary nested structure.
pub type EventPayload = HashMap<String, f64>;

type Handler = Box<dyn FnMut(&EventPayload)>;

struct Subscription {
    priority: i32,
    handler: Handler,
}

/// The event bus. Not `Send`/`Sync`; lives on the control thread alongside
/// everything else in this crate.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<String, Vec<Subscription>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to run when `event_name` is posted. Handlers with
    /// a higher `priority` run before lower-priority ones; ties preserve
    /// registration order.
    pub fn add_handler<F>(&mut self, event_name: impl Into<String>, priority: i32, handler: F)
    where
        F: FnMut(&EventPayload) + 'static,
    {
        let subs = self.subscribers.entry(event_name.into()).or_default();
        let pos = subs.partition_point(|s| s.priority >= priority);
        subs.insert(
            pos,
            Subscription {
                priority,
                handler: Box::new(handler),
            },
        );
    }

    /// Publishes `event_name` with an empty payload.
    pub fn post(&mut self, event_name: &str) {
        self.post_with(event_name, EventPayload::new());
    }

    /// Publishes `event_name` with `payload`, running every registered
    /// handler synchronously, highest priority first.
    pub fn post_with(&mut self, event_name: &str, payload: EventPayload) {
        tracing::trace!(event = event_name, "posting event");
        if let Some(subs) = self.subscribers.get_mut(event_name) {
            for sub in subs.iter_mut() {
                (sub.handler)(&payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_run_in_priority_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        let o1 = order.clone();
        bus.add_handler("ping", 0, move |_| o1.borrow_mut().push("low"));
        let o2 = order.clone();
        bus.add_handler("ping", 10, move |_| o2.borrow_mut().push("high"));

        bus.post("ping");
        assert_eq!(*order.borrow(), vec!["high", "low"]);
    }

    #[test]
    fn unposted_event_invokes_nothing() {
        let mut bus = EventBus::new();
        bus.add_handler("ping", 0, |_| panic!("should not run"));
        bus.post("pong");
    }

    #[test]
    fn payload_reaches_handler() {
        let seen = Rc::new(RefCell::new(0.0));
        let seen2 = seen.clone();
        let mut bus = EventBus::new();
        bus.add_handler("tilt", 0, move |payload| {
            *seen2.borrow_mut() = *payload.get("deviation_total").unwrap_or(&0.0);
        });
        let mut payload = EventPayload::new();
        payload.insert("deviation_total".into(), 0.75);
        bus.post_with("tilt", payload);
        assert!((*seen.borrow() - 0.75).abs() < f64::EPSILON);
    }
}
