use codec::v5::property::{Property, PropertyId};
use codec::{v4, v5, EncodePacket, Packet, ProtocolVersion, QoS};

fn round_trip(packet: &Packet, protocol_version: ProtocolVersion) -> Packet {
    let mut buf = Vec::new();
    codec::write_packet(packet, &mut buf).unwrap();
    codec::read_packet(&buf, protocol_version).unwrap()
}

#[test]
fn v4_connect_round_trips_with_credentials() {
    let mut connect = v4::ConnectPacket::new("round-trip-client").unwrap();
    connect.set_keep_alive(42);
    connect.set_username("alice").unwrap();
    connect.set_password(b"hunter2").unwrap();

    let decoded = round_trip(&Packet::V4Connect(connect), ProtocolVersion::V4);
    match decoded {
        Packet::V4Connect(p) => {
            assert_eq!(p.client_id(), "round-trip-client");
            assert_eq!(p.username(), Some("alice"));
        }
        other => panic!("expected V4Connect, got {other:?}"),
    }
}

#[test]
fn v5_connect_round_trips_allowed_properties() {
    let mut connect = v5::ConnectPacket::new("round-trip-client-v5").unwrap();
    connect.set_keep_alive(30);
    connect.add_property(Property::SessionExpiryInterval(3600));

    let decoded = round_trip(&Packet::V5Connect(connect), ProtocolVersion::V5);
    match decoded {
        Packet::V5Connect(p) => {
            assert_eq!(p.client_id(), "round-trip-client-v5");
            let prop = p.properties().get(PropertyId::SessionExpiryInterval);
            assert_eq!(prop, Some(&Property::SessionExpiryInterval(3600)));
        }
        other => panic!("expected V5Connect, got {other:?}"),
    }
}

#[test]
fn v4_publish_round_trips_topic_and_payload() {
    let publish = v4::PublishPacket::new("a/b/c", QoS::AtMostOnce, b"payload-bytes").unwrap();
    let decoded = round_trip(&Packet::V4Publish(publish), ProtocolVersion::V4);
    match decoded {
        Packet::V4Publish(p) => {
            assert_eq!(p.topic(), "a/b/c");
            assert_eq!(p.payload(), b"payload-bytes");
        }
        other => panic!("expected V4Publish, got {other:?}"),
    }
}

#[test]
fn v5_publish_round_trips_topic_and_payload() {
    let publish = v5::PublishPacket::new("a/b/c", QoS::AtMostOnce, b"payload-bytes").unwrap();
    let decoded = round_trip(&Packet::V5Publish(publish), ProtocolVersion::V5);
    match decoded {
        Packet::V5Publish(p) => {
            assert_eq!(p.topic(), "a/b/c");
            assert_eq!(p.payload(), b"payload-bytes");
        }
        other => panic!("expected V5Publish, got {other:?}"),
    }
}

#[test]
fn publish_round_trips_a_65536_byte_payload() {
    let payload = vec![0x5a_u8; 65_536];

    let v4_publish = v4::PublishPacket::new("bulk/v4", QoS::AtMostOnce, &payload).unwrap();
    let decoded = round_trip(&Packet::V4Publish(v4_publish), ProtocolVersion::V4);
    match decoded {
        Packet::V4Publish(p) => assert_eq!(p.payload(), payload.as_slice()),
        other => panic!("expected V4Publish, got {other:?}"),
    }

    let v5_publish = v5::PublishPacket::new("bulk/v5", QoS::AtMostOnce, &payload).unwrap();
    let decoded = round_trip(&Packet::V5Publish(v5_publish), ProtocolVersion::V5);
    match decoded {
        Packet::V5Publish(p) => assert_eq!(p.payload(), payload.as_slice()),
        other => panic!("expected V5Publish, got {other:?}"),
    }
}

#[test]
fn v5_decode_rejects_a_property_id_not_allowed_for_connect() {
    // MaximumQoS is a CONNACK-only property; CONNECT's allow-list must
    // reject it even though `add_property` itself does not check.
    let mut connect = v5::ConnectPacket::new("disallowed-property").unwrap();
    connect.add_property(Property::MaximumQoS(1));

    let mut buf = Vec::new();
    connect.encode(&mut buf).unwrap();

    let result = codec::read_packet(&buf, ProtocolVersion::V5);
    assert!(result.is_err(), "CONNECT carrying a CONNACK-only property should fail to decode");
}

#[test]
fn peek_protocol_version_matches_the_full_decode() {
    let v4_connect = v4::ConnectPacket::new("peek-me").unwrap();
    let mut v4_buf = Vec::new();
    codec::write_packet(&Packet::V4Connect(v4_connect), &mut v4_buf).unwrap();
    assert_eq!(codec::peek_protocol_version(&v4_buf).unwrap(), ProtocolVersion::V4);

    let v5_connect = v5::ConnectPacket::new("peek-me-v5").unwrap();
    let mut v5_buf = Vec::new();
    codec::write_packet(&Packet::V5Connect(v5_connect), &mut v5_buf).unwrap();
    assert_eq!(codec::peek_protocol_version(&v5_buf).unwrap(), ProtocolVersion::V5);
}

#[test]
fn subscribe_and_unsubscribe_round_trip_topic_filters() {
    let topic = v4::SubscribeTopic::new("a/+/c", QoS::AtMostOnce).unwrap();
    let subscribe = v4::SubscribePacket::new(7, vec![topic]);
    let decoded = round_trip(&Packet::V4Subscribe(subscribe), ProtocolVersion::V4);
    match decoded {
        Packet::V4Subscribe(p) => {
            assert_eq!(p.packet_id(), 7);
            assert_eq!(p.topics().len(), 1);
            assert_eq!(p.topics()[0].topic_filter(), "a/+/c");
        }
        other => panic!("expected V4Subscribe, got {other:?}"),
    }

    let unsubscribe = v4::UnsubscribePacket::new(8, &["a/+/c"]).unwrap();
    let decoded = round_trip(&Packet::V4Unsubscribe(unsubscribe), ProtocolVersion::V4);
    match decoded {
        Packet::V4Unsubscribe(p) => {
            assert_eq!(p.packet_id(), 8);
            assert_eq!(p.topic_filters().collect::<Vec<_>>(), vec!["a/+/c"]);
        }
        other => panic!("expected V4Unsubscribe, got {other:?}"),
    }
}
