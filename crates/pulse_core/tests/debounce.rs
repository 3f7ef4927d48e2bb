//! Timer-driven subscription tests
//!
//! These run on a paused tokio clock inside a `LocalSet`, so debounce windows
//! advance deterministically.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pulse_core::{EventBus, SubscribeOptions, Value};
use tokio::task::LocalSet;
use tokio::time::sleep;

fn collecting_bus(options: SubscribeOptions) -> (EventBus, Rc<RefCell<Vec<Vec<Value>>>>) {
    let bus = EventBus::new();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    bus.subscribe_with("search", options, move |args| {
        sink.borrow_mut().push(args.to_vec());
        Ok(())
    });
    (bus, calls)
}

#[tokio::test(start_paused = true)]
async fn test_burst_within_window_fires_once_with_last_args() {
    LocalSet::new()
        .run_until(async {
            let (bus, calls) = collecting_bus(SubscribeOptions::delay(Duration::from_millis(100)));

            for query in ["r", "ru", "rus", "rust"] {
                assert_eq!(bus.dispatch("search", &[Value::from(query)]).unwrap(), 1);
                sleep(Duration::from_millis(30)).await;
            }
            assert!(calls.borrow().is_empty(), "nothing fires inside the window");

            sleep(Duration::from_millis(200)).await;
            assert_eq!(*calls.borrow(), vec![vec![Value::from("rust")]]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_separate_quiet_periods_fire_separately() {
    LocalSet::new()
        .run_until(async {
            let (bus, calls) = collecting_bus(SubscribeOptions::delay(Duration::from_millis(50)));

            bus.dispatch("search", &[Value::from(1)]).unwrap();
            sleep(Duration::from_millis(80)).await;
            bus.dispatch("search", &[Value::from(2)]).unwrap();
            sleep(Duration::from_millis(80)).await;

            assert_eq!(
                *calls.borrow(),
                vec![vec![Value::from(1)], vec![Value::from(2)]]
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_cancels_pending_timer() {
    LocalSet::new()
        .run_until(async {
            let bus = EventBus::new();
            let calls = Rc::new(RefCell::new(0));
            let sink = calls.clone();
            let id = bus.subscribe_with(
                "save",
                SubscribeOptions::delay(Duration::from_millis(10)),
                move |_| {
                    *sink.borrow_mut() += 1;
                    Ok(())
                },
            );

            bus.dispatch("save", &[]).unwrap();
            assert!(bus.unsubscribe(id));
            sleep(Duration::from_millis(50)).await;

            assert_eq!(*calls.borrow(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_delayed_once_still_fires_after_removal() {
    LocalSet::new()
        .run_until(async {
            let (bus, calls) = collecting_bus(
                SubscribeOptions::once().with_delay(Duration::from_millis(20)),
            );

            bus.dispatch("search", &[Value::from("x")]).unwrap();
            assert!(!bus.has_subscribers("search"));

            sleep(Duration::from_millis(40)).await;
            assert_eq!(calls.borrow().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_delayed_and_inline_subscriptions_mix() {
    LocalSet::new()
        .run_until(async {
            let (bus, delayed) = collecting_bus(SubscribeOptions::delay(Duration::from_millis(20)));
            let inline = Rc::new(RefCell::new(0));
            let sink = inline.clone();
            bus.subscribe("search", move |_| {
                *sink.borrow_mut() += 1;
                Ok(())
            });

            assert_eq!(bus.dispatch("search", &[]).unwrap(), 2);
            assert_eq!(*inline.borrow(), 1);
            assert!(delayed.borrow().is_empty());

            sleep(Duration::from_millis(30)).await;
            assert_eq!(delayed.borrow().len(), 1);
        })
        .await;
}

#[test]
fn test_debounced_dispatch_without_runtime_runs_inline() {
    let (bus, calls) = collecting_bus(SubscribeOptions::delay(Duration::from_millis(100)));

    assert_eq!(bus.dispatch("search", &[Value::from("now")]).unwrap(), 1);
    assert_eq!(*calls.borrow(), vec![vec![Value::from("now")]]);
    assert_eq!(bus.subscriber_count("search"), 1);
}
