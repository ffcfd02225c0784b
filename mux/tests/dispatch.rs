use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use codec::{TopicFilter, TopicName};
use mux::{Message, Mux};

#[test]
fn multiple_subscribers_on_overlapping_filters_each_receive_the_publish() {
    let mux = Mux::new();
    let received_plus = Arc::new(Mutex::new(Vec::new()));
    let received_hash = Arc::new(Mutex::new(Vec::new()));

    let rp = Arc::clone(&received_plus);
    mux.handle(
        &TopicFilter::new("home/+/temperature").unwrap(),
        Box::new(move |msg: &Message| rp.lock().unwrap().push(msg.topic.clone())),
    )
    .unwrap();

    let rh = Arc::clone(&received_hash);
    mux.handle(
        &TopicFilter::new("home/#").unwrap(),
        Box::new(move |msg: &Message| rh.lock().unwrap().push(msg.topic.clone())),
    )
    .unwrap();

    let topic = TopicName::new("home/kitchen/temperature").unwrap();
    let message = Message::new("home/kitchen/temperature", Bytes::from_static(b"21.5"));
    mux.dispatch(&topic, &message).unwrap();

    assert_eq!(
        received_plus.lock().unwrap().as_slice(),
        ["home/kitchen/temperature"]
    );
    assert_eq!(
        received_hash.lock().unwrap().as_slice(),
        ["home/kitchen/temperature"]
    );
}

#[test]
fn unsubscribing_stops_future_deliveries() {
    let mux = Mux::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    let filter = TopicFilter::new("a/b").unwrap();
    let id = mux
        .handle(
            &filter,
            Box::new(move |_msg: &Message| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    let topic = TopicName::new("a/b").unwrap();
    mux.dispatch(&topic, &Message::new("a/b", Bytes::from_static(b"1")))
        .unwrap();
    assert!(mux.remove(&filter, id).unwrap());
    mux.dispatch(&topic, &Message::new("a/b", Bytes::from_static(b"2")))
        .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn non_matching_topic_invokes_no_handlers() {
    let mux = Mux::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    mux.handle(
        &TopicFilter::new("a/b").unwrap(),
        Box::new(move |_msg: &Message| {
            c.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();
    mux.dispatch(
        &TopicName::new("a/c").unwrap(),
        &Message::new("a/c", Bytes::from_static(b"x")),
    )
    .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}
