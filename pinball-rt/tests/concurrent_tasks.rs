use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pinball_rt::{spawn, sleep, RuntimeBuilder};

/// Two tasks sleeping for different durations interleave on one thread:
/// the shorter sleep must observably finish first.
#[test]
fn shorter_sleep_finishes_before_longer_one() {
    let mut rt = RuntimeBuilder::new().build().unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));

    rt.block_on(async {
        let order_a = order.clone();
        let a = spawn(async move {
            sleep(Duration::from_millis(40)).await;
            order_a.borrow_mut().push("a");
        });
        let order_b = order.clone();
        let b = spawn(async move {
            sleep(Duration::from_millis(10)).await;
            order_b.borrow_mut().push("b");
        });
        a.await;
        b.await;
    });

    assert_eq!(*order.borrow(), vec!["b", "a"]);
}
