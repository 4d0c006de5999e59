use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::{ByteReceiver, SerialTransport};

/// A decoded transport frame, handed off to the control thread's drain loop
/// rather than applied directly from the transport's own task (see
/// `SPEC_FULL.md` §5: the control thread drains the handoff queue between
/// tick advances).
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    Switch { name: String, raw_state: u8 },
    Acceleration { x: f64, y: f64, z: f64 },
}

/// An error from [`SimulatedTransport`]: its `read_byte` only fails when its
/// upstream byte source is gone.
#[derive(Debug)]
pub struct SimulatedTransportError(pub(crate) String);

impl fmt::Display for SimulatedTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulated transport error: {}", self.0)
    }
}

/// A reference [`SerialTransport`] backed by an in-process byte queue,
/// decoding a small line protocol:
///
/// - `SW <name> <0|1>` — a switch transition
/// - `AX <x> <y> <z>` — an accelerometer sample
///
/// Lines that don't match either shape are logged and dropped, matching the
/// controller's own "noisy hardware" posture elsewhere in this crate.
pub struct SimulatedTransport {
    bytes: ByteReceiver,
    outbox: Rc<RefCell<VecDeque<ParsedEvent>>>,
}

impl SimulatedTransport {
    /// Creates a transport reading from `bytes` and depositing decoded
    /// events into `outbox` for the control loop to drain.
    pub fn new(bytes: ByteReceiver, outbox: Rc<RefCell<VecDeque<ParsedEvent>>>) -> Self {
        Self { bytes, outbox }
    }
}

impl SerialTransport for SimulatedTransport {
    type Error = SimulatedTransportError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn identify(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<u8, Self::Error> {
        Ok(self.bytes.read_byte().await)
    }

    async fn write(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn parse(&mut self, frame: &[u8]) {
        let line = String::from_utf8_lossy(frame);
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let event = match parts.next() {
            Some("SW") => (|| {
                let name = parts.next()?.to_string();
                let raw_state: u8 = parts.next()?.parse().ok()?;
                Some(ParsedEvent::Switch { name, raw_state })
            })(),
            Some("AX") => (|| {
                let x: f64 = parts.next()?.parse().ok()?;
                let y: f64 = parts.next()?.parse().ok()?;
                let z: f64 = parts.next()?.parse().ok()?;
                Some(ParsedEvent::Acceleration { x, y, z })
            })(),
            _ => None,
        };

        match event {
            Some(event) => self.outbox.borrow_mut().push_back(event),
            None => warn!(line = %line, "unrecognized transport frame, dropping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::byte_channel;

    #[test]
    fn parses_switch_frame() {
        let (_tx, rx) = byte_channel();
        let outbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut transport = SimulatedTransport::new(rx, outbox.clone());
        transport.parse(b"SW left_flipper 1");
        assert_eq!(
            outbox.borrow_mut().pop_front(),
            Some(ParsedEvent::Switch {
                name: "left_flipper".into(),
                raw_state: 1
            })
        );
    }

    #[test]
    fn parses_accelerometer_frame() {
        let (_tx, rx) = byte_channel();
        let outbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut transport = SimulatedTransport::new(rx, outbox.clone());
        transport.parse(b"AX 0.1 0.2 0.9");
        assert_eq!(
            outbox.borrow_mut().pop_front(),
            Some(ParsedEvent::Acceleration {
                x: 0.1,
                y: 0.2,
                z: 0.9
            })
        );
    }

    #[test]
    fn malformed_frame_is_dropped_not_fatal() {
        let (_tx, rx) = byte_channel();
        let outbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut transport = SimulatedTransport::new(rx, outbox.clone());
        transport.parse(b"garbage");
        assert!(outbox.borrow().is_empty());
    }
}
