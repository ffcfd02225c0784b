use std::sync::Arc;
use std::thread;
use std::time::Instant;

use broker::{Broker, BrokerOptions};
use codec::{v4, v5, EncodePacket, Packet, ProtocolVersion, QoS};
use mux::Mux;
use transport::{DuplexPipe, Transport};

fn read_one_packet(pipe: &mut DuplexPipe) -> Vec<u8> {
    let mut header = [0u8; 1];
    pipe.recv(&mut header).unwrap();
    let mut remaining = 0usize;
    let mut multiplier = 1usize;
    let mut out = vec![header[0]];
    loop {
        let mut b = [0u8; 1];
        pipe.recv(&mut b).unwrap();
        out.push(b[0]);
        remaining += usize::from(b[0] & 0x7f) * multiplier;
        if b[0] & 0x80 == 0 {
            break;
        }
        multiplier *= 128;
    }
    let mut payload = vec![0u8; remaining];
    pipe.recv(&mut payload).unwrap();
    out.extend_from_slice(&payload);
    out
}

#[test]
fn v5_client_gets_a_v5_connack() {
    let mux = Arc::new(Mux::new());
    let (mut client, server) = DuplexPipe::pair();
    let broker = Broker::new(Arc::clone(&mux), BrokerOptions::default());
    let handle = thread::spawn(move || broker.serve_conn(server, &Instant::now));

    let mut buf = Vec::new();
    v5::ConnectPacket::new("v5-session").unwrap().encode(&mut buf).unwrap();
    client.send(&buf).unwrap();

    let ack_buf = read_one_packet(&mut client);
    let ack = codec::read_packet(&ack_buf, ProtocolVersion::V5).unwrap();
    assert!(matches!(ack, Packet::V5ConnectAck(p) if p.reason_code() == v5::ConnectReasonCode::Success));

    let mut disc = Vec::new();
    v5::DisconnectPacket::default().encode(&mut disc).unwrap();
    client.send(&disc).unwrap();
    handle.join().unwrap().unwrap();
}

#[test]
fn sys_events_are_published_on_connect_and_disconnect_when_enabled() {
    let mux = Arc::new(Mux::new());
    let events: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let events_for_handler = Arc::clone(&events);
    mux.handle(
        &codec::TopicFilter::new("$SYS/brokers/+/+").unwrap(),
        Box::new(move |msg: &mux::Message| {
            events_for_handler.lock().unwrap().push(msg.topic.clone());
        }),
    )
    .unwrap();

    let (mut client, server) = DuplexPipe::pair();
    let broker = Broker::new(
        Arc::clone(&mux),
        BrokerOptions {
            sys_events_enabled: true,
        },
    );
    let handle = thread::spawn(move || broker.serve_conn(server, &Instant::now));

    let mut buf = Vec::new();
    v4::ConnectPacket::new("sys-events-client").unwrap().encode(&mut buf).unwrap();
    client.send(&buf).unwrap();
    let _ = read_one_packet(&mut client);

    let mut disc = Vec::new();
    v4::DisconnectPacket::new().encode(&mut disc).unwrap();
    client.send(&disc).unwrap();
    handle.join().unwrap().unwrap();

    let seen = events.lock().unwrap();
    assert!(seen.iter().any(|t| t.ends_with("/connected")));
    assert!(seen.iter().any(|t| t.ends_with("/disconnected")));
}

#[test]
fn unsubscribe_stops_further_delivery_to_that_connection() {
    let mux = Arc::new(Mux::new());

    let (mut sub_client, sub_server) = DuplexPipe::pair();
    let sub_broker = Broker::new(Arc::clone(&mux), BrokerOptions::default());
    let sub_handle = thread::spawn(move || sub_broker.serve_conn(sub_server, &Instant::now));

    let mut connect_buf = Vec::new();
    v4::ConnectPacket::new("unsub-test").unwrap().encode(&mut connect_buf).unwrap();
    sub_client.send(&connect_buf).unwrap();
    let _ = read_one_packet(&mut sub_client);

    let topic = v4::SubscribeTopic::new("metrics/#", QoS::AtMostOnce).unwrap();
    let mut sub_buf = Vec::new();
    v4::SubscribePacket::new(1, vec![topic]).encode(&mut sub_buf).unwrap();
    sub_client.send(&sub_buf).unwrap();
    let _ = read_one_packet(&mut sub_client);

    let mut unsub_buf = Vec::new();
    v4::UnsubscribePacket::new(2, &["metrics/#"]).unwrap().encode(&mut unsub_buf).unwrap();
    sub_client.send(&unsub_buf).unwrap();
    let _ = read_one_packet(&mut sub_client);

    let (mut pub_client, pub_server) = DuplexPipe::pair();
    let pub_broker = Broker::new(Arc::clone(&mux), BrokerOptions::default());
    let pub_handle = thread::spawn(move || pub_broker.serve_conn(pub_server, &Instant::now));

    let mut pub_connect_buf = Vec::new();
    v4::ConnectPacket::new("unsub-publisher").unwrap().encode(&mut pub_connect_buf).unwrap();
    pub_client.send(&pub_connect_buf).unwrap();
    let _ = read_one_packet(&mut pub_client);

    let mut publish_buf = Vec::new();
    v4::PublishPacket::new("metrics/cpu", QoS::AtMostOnce, b"0.5")
        .unwrap()
        .encode(&mut publish_buf)
        .unwrap();
    pub_client.send(&publish_buf).unwrap();

    sub_client.set_recv_timeout(Some(std::time::Duration::from_millis(100))).unwrap();
    let mut probe = [0u8; 1];
    let result = sub_client.recv(&mut probe);
    assert_eq!(result, Err(transport::TransportError::Timeout));

    let mut disc = Vec::new();
    v4::DisconnectPacket::new().encode(&mut disc).unwrap();
    sub_client.send(&disc).unwrap();
    pub_client.send(&disc).unwrap();
    sub_handle.join().unwrap().unwrap();
    pub_handle.join().unwrap().unwrap();
}

#[test]
fn hash_subscriber_is_isolated_from_sys_topics_but_dollar_sys_hash_subscriber_is_not() {
    let mux = Arc::new(Mux::new());
    let hash_events: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sys_events: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

    let hash_for_handler = Arc::clone(&hash_events);
    mux.handle(
        &codec::TopicFilter::new("#").unwrap(),
        Box::new(move |msg: &mux::Message| {
            hash_for_handler.lock().unwrap().push(msg.topic.clone());
        }),
    )
    .unwrap();

    let sys_for_handler = Arc::clone(&sys_events);
    mux.handle(
        &codec::TopicFilter::new("$SYS/#").unwrap(),
        Box::new(move |msg: &mux::Message| {
            sys_for_handler.lock().unwrap().push(msg.topic.clone());
        }),
    )
    .unwrap();

    let (mut client, server) = DuplexPipe::pair();
    let broker = Broker::new(
        Arc::clone(&mux),
        BrokerOptions {
            sys_events_enabled: true,
        },
    );
    let handle = thread::spawn(move || broker.serve_conn(server, &Instant::now));

    let mut buf = Vec::new();
    v4::ConnectPacket::new("sys-isolation-client").unwrap().encode(&mut buf).unwrap();
    client.send(&buf).unwrap();
    let _ = read_one_packet(&mut client);

    let mut disc = Vec::new();
    v4::DisconnectPacket::new().encode(&mut disc).unwrap();
    client.send(&disc).unwrap();
    handle.join().unwrap().unwrap();

    assert!(
        sys_events.lock().unwrap().iter().any(|t| t.ends_with("/connected")),
        "a $SYS/# subscriber must see $SYS events"
    );
    assert!(
        !hash_events.lock().unwrap().iter().any(|t| t.starts_with("$SYS/")),
        "a bare # subscriber must never see $SYS events"
    );
}
