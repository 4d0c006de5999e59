use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use pinball_core::transport::{byte_channel, read_until, ParsedEvent, SimulatedTransport};

/// Drives a `SimulatedTransport` through `read_until`+`parse` inside a real
/// `pinball-rt` executor, fed by a separately spawned task writing to its
/// `ByteSender` half. Exercises the same await points `run` itself would.
#[test]
fn decoded_frames_reach_the_outbox_through_read_until() {
    let (tx, rx) = byte_channel();
    let outbox = Rc::new(RefCell::new(VecDeque::new()));
    let mut transport = SimulatedTransport::new(rx, outbox.clone());

    let mut rt = pinball_rt::RuntimeBuilder::new().build().unwrap();
    rt.block_on(async {
        pinball_rt::spawn(async move {
            tx.send_slice(b"SW left_flipper 1\n");
            tx.send_slice(b"AX 0.0 0.0 1.0\n");
        });

        let frame = read_until(&mut transport, b'\n', 0).await.unwrap();
        transport.parse(&frame);
        let frame = read_until(&mut transport, b'\n', 0).await.unwrap();
        transport.parse(&frame);
    });

    let events: Vec<_> = outbox.borrow_mut().drain(..).collect();
    assert_eq!(
        events,
        vec![
            ParsedEvent::Switch {
                name: "left_flipper".into(),
                raw_state: 1
            },
            ParsedEvent::Acceleration {
                x: 0.0,
                y: 0.0,
                z: 1.0
            },
        ]
    );
}
