// tests/event_bus.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taskpen::events::{EventBus, SubscriberId};

#[test]
fn every_subscriber_sees_each_publish_exactly_once() {
    let bus: EventBus<u32> = EventBus::new();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    {
        let first = Arc::clone(&first);
        bus.subscribe(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let second = Arc::clone(&second);
        bus.subscribe(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
        });
    }

    bus.publish(&1);
    bus.publish(&2);

    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[test]
fn subscriber_may_unsubscribe_itself_during_delivery() {
    let bus: EventBus<u32> = EventBus::new();

    let self_calls = Arc::new(AtomicUsize::new(0));
    let other_calls = Arc::new(AtomicUsize::new(0));

    // The subscriber removes itself while the publish that reached it is
    // still being delivered.
    let self_id: Arc<Mutex<Option<SubscriberId>>> = Arc::new(Mutex::new(None));
    let id = {
        let bus = bus.clone();
        let self_id = Arc::clone(&self_id);
        let self_calls = Arc::clone(&self_calls);
        bus.clone().subscribe(move |_| {
            self_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *self_id.lock().unwrap() {
                bus.unsubscribe(id);
            }
        })
    };
    *self_id.lock().unwrap() = Some(id);

    {
        let other_calls = Arc::clone(&other_calls);
        bus.subscribe(move |_| {
            other_calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    bus.publish(&1);
    assert_eq!(self_calls.load(Ordering::SeqCst), 1);
    assert_eq!(other_calls.load(Ordering::SeqCst), 1);

    // Removed subscriber is gone for the next publish; the other survives.
    bus.publish(&2);
    assert_eq!(self_calls.load(Ordering::SeqCst), 1);
    assert_eq!(other_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn subscriber_added_during_delivery_only_sees_later_publishes() {
    let bus: EventBus<u32> = EventBus::new();

    let late_calls = Arc::new(AtomicUsize::new(0));

    {
        let bus_handle = bus.clone();
        let late_calls = Arc::clone(&late_calls);
        let added = Arc::new(AtomicUsize::new(0));
        bus.subscribe(move |_| {
            if added.fetch_add(1, Ordering::SeqCst) == 0 {
                let late_calls = Arc::clone(&late_calls);
                bus_handle.subscribe(move |_| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
    }

    // Delivery operates on the snapshot taken at publish time: the
    // subscriber registered mid-delivery must not see this event.
    bus.publish(&1);
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    bus.publish(&2);
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribing_a_stale_id_is_a_no_op() {
    let bus: EventBus<u32> = EventBus::new();
    let id = bus.subscribe(|_| {});
    bus.unsubscribe(id);
    bus.unsubscribe(id);
    assert_eq!(bus.subscriber_count(), 0);
}
