use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use client::{Client, ClientOptions};
use codec::QoS;
use mux::{Message, Mux};
use transport::DuplexPipe;

/// Drives one broker session on the calling thread, against `transport`.
fn spawn_broker(mux: Arc<Mux>, transport: DuplexPipe) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let broker = broker::Broker::new(mux, broker::BrokerOptions::default());
        broker
            .serve_conn(transport, &std::time::Instant::now)
            .expect("broker session failed");
    })
}

#[test]
fn publisher_and_subscriber_exchange_a_message_through_the_broker() {
    let _ = env_logger::try_init();
    let broker_mux = Arc::new(Mux::new());

    let (sub_client_side, sub_broker_side) = DuplexPipe::pair();
    let sub_broker_handle = spawn_broker(Arc::clone(&broker_mux), sub_broker_side);

    let (pub_client_side, pub_broker_side) = DuplexPipe::pair();
    let pub_broker_handle = spawn_broker(Arc::clone(&broker_mux), pub_broker_side);

    let sub_app_mux = Arc::new(Mux::new());
    let received = Arc::new(Mutex::new(None));
    let received_in_handler = Arc::clone(&received);
    sub_app_mux
        .handle(
            &codec::TopicFilter::new("sensors/+").unwrap(),
            Box::new(move |msg: &Message| {
                *received_in_handler.lock().unwrap() = Some((msg.topic.clone(), msg.payload.clone()));
            }),
        )
        .unwrap();

    let mut subscriber = Client::connect(
        sub_client_side,
        Arc::clone(&sub_app_mux),
        ClientOptions {
            client_id: "subscriber".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    subscriber.subscribe(&[("sensors/+", QoS::AtMostOnce)]).unwrap();

    let mut publisher = Client::connect(
        pub_client_side,
        Arc::new(Mux::new()),
        ClientOptions {
            client_id: "publisher".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    publisher.publish("sensors/kitchen", b"21.5").unwrap();

    assert!(subscriber.poll(Duration::from_secs(1)).unwrap());
    let (topic, payload) = received.lock().unwrap().clone().expect("no message delivered");
    assert_eq!(topic, "sensors/kitchen");
    assert_eq!(&payload[..], b"21.5");

    drop(subscriber);
    drop(publisher);
    sub_broker_handle.join().unwrap();
    pub_broker_handle.join().unwrap();
}

#[test]
fn reconnect_resubscribes_previously_subscribed_filters() {
    let _ = env_logger::try_init();
    let broker_mux = Arc::new(Mux::new());

    let (client_side, broker_side) = DuplexPipe::pair();
    let broker_handle = spawn_broker(Arc::clone(&broker_mux), broker_side);

    let app_mux = Arc::new(Mux::new());
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_in_handler = Arc::clone(&received);
    app_mux
        .handle(
            &codec::TopicFilter::new("alerts/#").unwrap(),
            Box::new(move |msg: &Message| {
                received_in_handler.lock().unwrap().push(msg.payload.clone());
            }),
        )
        .unwrap();

    let mut client = Client::connect(
        client_side,
        Arc::clone(&app_mux),
        ClientOptions {
            client_id: "reconnecting".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    client.subscribe(&[("alerts/#", QoS::AtMostOnce)]).unwrap();
    let _ = client.poll(Duration::from_millis(50));

    let (new_client_side, new_broker_side) = DuplexPipe::pair();
    let new_broker_handle = spawn_broker(Arc::clone(&broker_mux), new_broker_side);
    // Replacing the transport drops the old one, which unblocks the first
    // broker session's read with a clean `Closed` error.
    client.reconnect(new_client_side).unwrap();
    broker_handle.join().unwrap();

    let (pub_client_side, pub_broker_side) = DuplexPipe::pair();
    let pub_broker_handle = spawn_broker(Arc::clone(&broker_mux), pub_broker_side);
    let mut publisher = Client::connect(
        pub_client_side,
        Arc::new(Mux::new()),
        ClientOptions {
            client_id: "alert-source".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    publisher.publish("alerts/disk-full", b"low space").unwrap();

    assert!(client.poll(Duration::from_secs(1)).unwrap());
    assert_eq!(received.lock().unwrap().as_slice(), [bytes::Bytes::from_static(b"low space")]);

    drop(client);
    drop(publisher);
    new_broker_handle.join().unwrap();
    pub_broker_handle.join().unwrap();
}

#[test]
fn large_payload_is_delivered_intact_end_to_end() {
    let _ = env_logger::try_init();
    let broker_mux = Arc::new(Mux::new());

    let (sub_client_side, sub_broker_side) = DuplexPipe::pair();
    let sub_broker_handle = spawn_broker(Arc::clone(&broker_mux), sub_broker_side);

    let (pub_client_side, pub_broker_side) = DuplexPipe::pair();
    let pub_broker_handle = spawn_broker(Arc::clone(&broker_mux), pub_broker_side);

    let sub_app_mux = Arc::new(Mux::new());
    let received = Arc::new(Mutex::new(None));
    let received_in_handler = Arc::clone(&received);
    sub_app_mux
        .handle(
            &codec::TopicFilter::new("bulk/#").unwrap(),
            Box::new(move |msg: &Message| {
                *received_in_handler.lock().unwrap() = Some(msg.payload.clone());
            }),
        )
        .unwrap();

    let mut subscriber = Client::connect(
        sub_client_side,
        Arc::clone(&sub_app_mux),
        ClientOptions {
            client_id: "bulk-subscriber".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    subscriber.subscribe(&[("bulk/#", QoS::AtMostOnce)]).unwrap();

    let mut publisher = Client::connect(
        pub_client_side,
        Arc::new(Mux::new()),
        ClientOptions {
            client_id: "bulk-publisher".to_string(),
            ..ClientOptions::default()
        },
    )
    .unwrap();
    let payload = vec![0x42_u8; 65_536];
    publisher.publish("bulk/data", &payload).unwrap();

    assert!(subscriber.poll(Duration::from_secs(1)).unwrap());
    let delivered = received.lock().unwrap().clone().expect("no message delivered");
    assert_eq!(delivered.len(), payload.len());
    assert_eq!(&delivered[..], payload.as_slice());

    drop(subscriber);
    drop(publisher);
    sub_broker_handle.join().unwrap();
    pub_broker_handle.join().unwrap();
}
