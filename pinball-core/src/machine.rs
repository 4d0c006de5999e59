//! Wires the timing service, switch controller, accelerometer processors,
//! and event bus into a runnable control loop.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use tracing::{info, warn};

use crate::accelerometer::AccelerometerProcessor;
use crate::config::MachineConfig;
use crate::error::{CoreError, Result};
use crate::events::EventBus;
use crate::platform::PlatformDriver;
use crate::switches::{Switch, SwitchController};
use crate::timing::TimingService;
use crate::transport::{run as run_transport, ParsedEvent, SerialTransport};

/// The event posted on the bus when the serial transport fails and the
/// control loop is about to stop.
pub const MACHINE_STOP_EVENT: &str = "machine_stop";

/// The assembled core: a timing service, switch controller, one processor
/// per configured accelerometer, and the event bus they all post to.
///
/// Owns the outbox a [`SerialTransport`] deposits decoded events into;
/// [`Self::run`] drains it between tick advances rather than applying
/// transport events the instant they are decoded, so that switch and
/// accelerometer state only ever changes at a tick boundary.
pub struct Machine {
    timing: Rc<RefCell<TimingService>>,
    events: Rc<RefCell<EventBus>>,
    switches: SwitchController,
    accelerometers: HashMap<String, AccelerometerProcessor>,
    outbox: Rc<RefCell<VecDeque<ParsedEvent>>>,
    secs_per_tick: Duration,
}

impl Machine {
    /// Builds a machine from `config`, configuring `platform` for every
    /// declared accelerometer and seeding every declared switch's initial
    /// hardware reading, then posting `machine_init_complete`.
    pub fn new(config: MachineConfig, platform: &mut impl PlatformDriver) -> Result<Self> {
        let switch_count = config.switches.len();
        let mut timing = TimingService::new();
        timing.configure(config.hz)?;
        let timing = Rc::new(RefCell::new(timing));
        let events = Rc::new(RefCell::new(EventBus::new()));

        let mut switches = SwitchController::new(timing.clone(), events.clone());
        let mut initial_raw_states = HashMap::new();
        for sw in &config.switches {
            switches.add_switch(Switch::new(
                sw.name.clone(),
                sw.number.clone(),
                sw.switch_type.into(),
                sw.tags.clone(),
            ));
            initial_raw_states.insert(sw.name.clone(), sw.initial_raw_state);
        }
        switches.initialize_hw_states(&initial_raw_states)?;

        let mut accelerometers = HashMap::new();
        for (name, accel_config) in config.accelerometers {
            platform.configure_accelerometer(&name, &name, false)?;
            accelerometers.insert(name, AccelerometerProcessor::new(events.clone(), accel_config));
        }

        events.borrow_mut().post("machine_init_complete");
        info!(
            hz = config.hz,
            switches = switch_count,
            accelerometers = accelerometers.len(),
            "machine initialized"
        );

        Ok(Self {
            timing,
            events,
            switches,
            accelerometers,
            outbox: Rc::new(RefCell::new(VecDeque::new())),
            secs_per_tick: Duration::from_secs_f64(1.0 / config.hz as f64),
        })
    }

    /// The event bus handlers can subscribe to, shared with every other
    /// piece of the machine.
    pub fn events(&self) -> Rc<RefCell<EventBus>> {
        self.events.clone()
    }

    /// The switch controller, for registering handlers or inspecting state.
    pub fn switches(&mut self) -> &mut SwitchController {
        &mut self.switches
    }

    /// The shared outbox a [`SerialTransport`] should deposit decoded events
    /// into; [`Self::run`] drains it once per tick.
    pub fn outbox(&self) -> Rc<RefCell<VecDeque<ParsedEvent>>> {
        self.outbox.clone()
    }

    /// Feeds one accelerometer sample to the named device's processor, if
    /// one was configured; otherwise logs and drops it.
    pub fn update_acceleration(&mut self, device: &str, sample: (f64, f64, f64)) {
        match self.accelerometers.get_mut(device) {
            Some(proc) => proc.update_acceleration(sample),
            None => warn!(device, "acceleration sample for unconfigured device, dropping"),
        }
    }

    fn drain_outbox(&mut self) {
        while let Some(event) = self.outbox.borrow_mut().pop_front() {
            match event {
                ParsedEvent::Switch { name, raw_state } => {
                    if let Err(err) = self.switches.process_switch(&name, raw_state, false) {
                        warn!(switch = %name, error = %err, "failed to process switch event");
                    }
                }
                ParsedEvent::Acceleration { x, y, z } => {
                    // The reference line protocol carries no device name, so
                    // a sample is routed to whichever accelerometer was
                    // configured first. Real hardware dialects disambiguate
                    // by wire address; that's out of scope here.
                    if let Some(proc) = self.accelerometers.values_mut().next() {
                        proc.update_acceleration((x, y, z));
                    }
                }
            }
        }
    }

    /// Runs the control loop until the transport fails or the process is
    /// otherwise torn down: advances the tick clock at the configured rate,
    /// draining `transport`'s outbox between each advance, while
    /// `transport`'s own connect/identify/read/parse loop runs interleaved
    /// as a separate task on the same executor.
    ///
    /// A transport failure posts [`MACHINE_STOP_EVENT`] on the event bus and
    /// stops the tick loop on its next iteration, per the "signals
    /// machine-wide stop" contract the serial transport collaborator is
    /// expected to honor.
    ///
    /// Must be driven from inside a [`pinball_rt::Runtime::block_on`] call.
    pub async fn run<T>(mut self, mut transport: T)
    where
        T: SerialTransport + 'static,
    {
        let events = self.events.clone();
        let stop = Rc::new(Cell::new(false));
        let stop_on_failure = stop.clone();
        pinball_rt::spawn(async move {
            if let Err(err) = run_transport(&mut transport).await {
                let failure = CoreError::Transport(err.to_string());
                warn!(error = %failure, "transport loop ended, stopping machine");
                events.borrow_mut().post(MACHINE_STOP_EVENT);
                stop_on_failure.set(true);
            }
        });

        loop {
            pinball_rt::sleep(self.secs_per_tick).await;
            self.drain_outbox();
            self.timing.borrow_mut().tick();
            self.switches.tick_hook();
            if stop.get() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullPlatformDriver;
    use crate::transport::byte_channel;
    use std::cell::Cell;

    fn sample_config() -> MachineConfig {
        MachineConfig::from_yaml(
            r#"
hz: 50
switches:
  - name: left_flipper
    number: "12"
    type: no
    tags: [left_flipper]
accelerometers:
  plumb_bob:
    level_ref: [0.0, 0.0, 1.0]
"#,
        )
        .unwrap()
    }

    #[test]
    fn new_posts_init_complete_and_seeds_switches() {
        let config = sample_config();
        let mut platform = NullPlatformDriver;
        let machine = Machine::new(config, &mut platform).unwrap();
        assert!(machine.switches().is_registered("left_flipper"));
    }

    #[test]
    fn drain_outbox_applies_queued_switch_events() {
        let config = sample_config();
        let mut platform = NullPlatformDriver;
        let mut machine = Machine::new(config, &mut platform).unwrap();

        let fired = Rc::new(Cell::new(false));
        let fired2 = fired.clone();
        machine
            .switches()
            .add_switch_handler("left_flipper", 1, 0, move || fired2.set(true))
            .unwrap();

        machine
            .outbox()
            .borrow_mut()
            .push_back(ParsedEvent::Switch {
                name: "left_flipper".into(),
                raw_state: 1,
            });
        machine.drain_outbox();
        assert!(fired.get());
    }

    #[test]
    fn unconfigured_device_sample_is_dropped_not_fatal() {
        let config = sample_config();
        let mut platform = NullPlatformDriver;
        let mut machine = Machine::new(config, &mut platform).unwrap();
        machine.update_acceleration("ghost", (0.0, 0.0, 1.0));
    }

    #[test]
    fn outbox_handle_is_shared_with_a_transport() {
        let config = sample_config();
        let mut platform = NullPlatformDriver;
        let machine = Machine::new(config, &mut platform).unwrap();
        let (_tx, rx) = byte_channel();
        let mut transport = crate::transport::SimulatedTransport::new(rx, machine.outbox());
        transport.parse(b"SW left_flipper 1");
        assert_eq!(machine.outbox().borrow().len(), 1);
    }

    /// A transport whose every read fails immediately, to exercise `run`'s
    /// machine-wide stop path without waiting on real hardware.
    struct FailingTransport;

    impl SerialTransport for FailingTransport {
        type Error = &'static str;

        async fn connect(&mut self) -> std::result::Result<(), Self::Error> {
            Ok(())
        }

        async fn identify(&mut self) -> std::result::Result<(), Self::Error> {
            Ok(())
        }

        async fn read_byte(&mut self) -> std::result::Result<u8, Self::Error> {
            Err("no hardware attached")
        }

        async fn write(&mut self, _data: &[u8]) -> std::result::Result<(), Self::Error> {
            Ok(())
        }

        fn parse(&mut self, _frame: &[u8]) {}
    }

    #[test]
    fn run_stops_and_posts_machine_stop_after_transport_failure() {
        let config = sample_config();
        let mut platform = NullPlatformDriver;
        let machine = Machine::new(config, &mut platform).unwrap();

        let stopped = Rc::new(Cell::new(false));
        let stopped2 = stopped.clone();
        machine
            .events()
            .borrow_mut()
            .add_handler(MACHINE_STOP_EVENT, 0, move |_| stopped2.set(true));

        let mut rt = pinball_rt::RuntimeBuilder::new().build().unwrap();
        rt.block_on(machine.run(FailingTransport));
        assert!(stopped.get());
    }
}
