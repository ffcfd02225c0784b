use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use codec::{v4, v5, ClientIdError, EncodePacket, Packet, ProtocolVersion, TopicFilter, TopicName};
use mux::{HandlerId, Message, Mux};
use transport::{Transport, TransportError};

use crate::error::BrokerError;
use crate::options::BrokerOptions;

/// Inline scratch-buffer threshold below which a packet payload is copied
/// into a reused buffer instead of a fresh allocation, per the framing
/// budget in the messaging spec this session implements.
const INLINE_PAYLOAD_CAP: usize = 4096;

/// Identifies one connection for the lifetime of the process, so a
/// publish's [`Message::origin`] can be compared against a subscribing
/// connection's own id for v5 "no local" suppression.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Connected,
    Closing,
}

enum Inbound {
    Connect {
        client_id: String,
        keep_alive: u16,
        username: Option<String>,
        clean_session: bool,
    },
    Publish {
        topic: String,
        payload: Bytes,
    },
    Subscribe {
        packet_id: u16,
        /// Filter string paired with its v5 "no local" bit (always `false`
        /// for a v4 SUBSCRIBE, which has no such option).
        filters: Vec<(String, bool)>,
    },
    Unsubscribe {
        packet_id: u16,
        filters: Vec<String>,
    },
    PingRequest,
    Disconnect,
}

fn decode_inbound(buf: &[u8], protocol_version: ProtocolVersion) -> Result<Inbound, BrokerError> {
    let packet = codec::read_packet(buf, protocol_version)?;
    match packet {
        Packet::V4Connect(p) => Ok(Inbound::Connect {
            client_id: p.client_id().to_string(),
            keep_alive: p.keep_alive(),
            username: p.username().map(ToOwned::to_owned),
            clean_session: p.clean_session(),
        }),
        Packet::V5Connect(p) => Ok(Inbound::Connect {
            client_id: p.client_id().to_string(),
            keep_alive: p.keep_alive(),
            username: p.username().map(ToOwned::to_owned),
            clean_session: p.clean_start(),
        }),
        Packet::V4Publish(p) => Ok(Inbound::Publish {
            topic: p.topic().to_string(),
            payload: Bytes::copy_from_slice(p.payload()),
        }),
        Packet::V5Publish(p) => Ok(Inbound::Publish {
            topic: p.topic().to_string(),
            payload: Bytes::copy_from_slice(p.payload()),
        }),
        Packet::V4Subscribe(p) => Ok(Inbound::Subscribe {
            packet_id: p.packet_id(),
            filters: p
                .topics()
                .iter()
                .map(|t| (t.topic_filter().to_string(), false))
                .collect(),
        }),
        Packet::V5Subscribe(p) => Ok(Inbound::Subscribe {
            packet_id: p.packet_id(),
            filters: p
                .topics()
                .iter()
                .map(|t| (t.topic_filter().to_string(), t.options().no_local()))
                .collect(),
        }),
        Packet::V4Unsubscribe(p) => Ok(Inbound::Unsubscribe {
            packet_id: p.packet_id(),
            filters: p.topic_filters().map(ToOwned::to_owned).collect(),
        }),
        Packet::V5Unsubscribe(p) => Ok(Inbound::Unsubscribe {
            packet_id: p.packet_id(),
            filters: p.topic_filters().map(ToOwned::to_owned).collect(),
        }),
        Packet::V4PingRequest(_) | Packet::V5PingRequest(_) => Ok(Inbound::PingRequest),
        Packet::V4Disconnect(_) | Packet::V5Disconnect(_) => Ok(Inbound::Disconnect),
        other => Err(BrokerError::Protocol(format!(
            "unexpected packet from client: {other:?}"
        ))),
    }
}

fn connect_ack(protocol_version: ProtocolVersion, accepted: bool) -> Packet {
    match protocol_version {
        ProtocolVersion::V4 => {
            let code = if accepted {
                v4::ConnectReturnCode::Accepted
            } else {
                v4::ConnectReturnCode::NotAuthorized
            };
            Packet::V4ConnectAck(v4::ConnectAckPacket::new(false, code))
        }
        ProtocolVersion::V5 => {
            let code = if accepted {
                v5::ConnectReasonCode::Success
            } else {
                v5::ConnectReasonCode::NotAuthorized
            };
            Packet::V5ConnectAck(v5::ConnectAckPacket::new(false, code))
        }
    }
}

fn subscribe_ack(protocol_version: ProtocolVersion, packet_id: u16, count: usize) -> Packet {
    match protocol_version {
        ProtocolVersion::V4 => Packet::V4SubscribeAck(v4::SubscribeAckPacket::new(
            packet_id,
            vec![v4::SubscribeAckReason::SuccessMaxQoS0; count],
        )),
        ProtocolVersion::V5 => Packet::V5SubscribeAck(v5::SubscribeAckPacket::new(
            packet_id,
            vec![v5::SubscribeReasonCode::GrantedQoS0; count],
        )),
    }
}

fn unsubscribe_ack(protocol_version: ProtocolVersion, packet_id: u16, count: usize) -> Packet {
    match protocol_version {
        ProtocolVersion::V4 => Packet::V4UnsubscribeAck(v4::UnsubscribeAckPacket::new(packet_id)),
        ProtocolVersion::V5 => {
            Packet::V5UnsubscribeAck(v5::UnsubscribeAckPacket::new(packet_id, vec![0x00; count]))
        }
    }
}

fn ping_response(protocol_version: ProtocolVersion) -> Packet {
    match protocol_version {
        ProtocolVersion::V4 => Packet::V4PingResponse(v4::PingResponsePacket::new()),
        ProtocolVersion::V5 => Packet::V5PingResponse(v5::PingResponsePacket::new()),
    }
}

fn forward_publish(protocol_version: ProtocolVersion, topic: &str, payload: &[u8]) -> Result<Packet, BrokerError> {
    match protocol_version {
        ProtocolVersion::V4 => Ok(Packet::V4Publish(v4::PublishPacket::new(
            topic,
            codec::QoS::AtMostOnce,
            payload,
        )?)),
        ProtocolVersion::V5 => Ok(Packet::V5Publish(v5::PublishPacket::new(
            topic,
            codec::QoS::AtMostOnce,
            payload,
        )?)),
    }
}

/// Read exactly `buf.len()` bytes, treating a zero-byte read as peer-close.
fn recv_exact<T: Transport>(transport: &mut T, buf: &mut [u8]) -> Result<(), TransportError> {
    let mut read = 0;
    while read < buf.len() {
        let n = transport.recv(&mut buf[read..])?;
        if n == 0 {
            return Err(TransportError::Closed);
        }
        read += n;
    }
    Ok(())
}

/// Read one full MQTT control packet (fixed header plus its declared
/// remaining length) off `transport`. The remaining-length bytes bound how
/// much is buffered, so a malformed or hostile length longer than the wire
/// limit is rejected by `VarInt` decoding downstream rather than here.
///
/// `scratch` is reused across calls for payloads up to
/// [`INLINE_PAYLOAD_CAP`]; only a payload larger than that gets its own
/// fresh allocation.
fn read_one_packet<T: Transport>(transport: &mut T, scratch: &mut Vec<u8>) -> Result<Vec<u8>, BrokerError> {
    let mut header_byte = [0u8; 1];
    recv_exact(transport, &mut header_byte)?;

    let mut remaining_length: usize = 0;
    let mut multiplier: usize = 1;
    let mut length_bytes = Vec::with_capacity(1);
    loop {
        let mut b = [0u8; 1];
        recv_exact(transport, &mut b)?;
        length_bytes.push(b[0]);
        remaining_length += usize::from(b[0] & 0x7f) * multiplier;
        if b[0] & 0x80 == 0 {
            break;
        }
        if length_bytes.len() == 4 {
            return Err(BrokerError::Protocol("remaining length exceeds 4 bytes".to_string()));
        }
        multiplier *= 128;
    }

    let mut full = Vec::with_capacity(1 + length_bytes.len() + remaining_length);
    full.push(header_byte[0]);
    full.extend_from_slice(&length_bytes);

    if remaining_length <= INLINE_PAYLOAD_CAP {
        scratch.clear();
        scratch.resize(remaining_length, 0);
        recv_exact(transport, scratch)?;
        full.extend_from_slice(scratch);
    } else {
        let mut payload = vec![0u8; remaining_length];
        recv_exact(transport, &mut payload)?;
        full.extend_from_slice(&payload);
    }
    Ok(full)
}

fn write_packet<T: Transport>(transport: &Arc<Mutex<T>>, packet: &Packet) -> Result<(), BrokerError> {
    let mut buf = Vec::new();
    codec::write_packet(packet, &mut buf)?;
    let mut guard = transport.lock().expect("session transport mutex poisoned");
    guard.send(&buf)?;
    Ok(())
}

fn sys_event(mux: &Mux, client_id: &str, event: &str, username: Option<&str>) {
    let topic = format!("$SYS/brokers/{client_id}/{event}");
    let payload = serde_json::json!({
        "clientid": client_id,
        "username": username.unwrap_or(""),
    });
    let Ok(topic_name) = TopicName::new(&topic) else {
        log::warn!("broker: refusing to publish malformed $SYS topic {topic}");
        return;
    };
    let message = Message::new(topic, Bytes::from(payload.to_string()));
    if let Err(err) = mux.dispatch(&topic_name, &message) {
        log::warn!("broker: failed to publish $SYS event: {err}");
    }
}

/// Run one session to completion: blocks the calling thread for the
/// lifetime of `transport`. The caller owns the accept loop and is expected
/// to call this on a freshly spawned thread per accepted connection.
pub fn run<T>(mux: &Arc<Mux>, options: BrokerOptions, transport: T, clock: &dyn Fn() -> Instant) -> Result<(), BrokerError>
where
    T: Transport + 'static,
{
    let _ = clock;
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    let conn = Arc::new(Mutex::new(transport));
    let mut state = SessionState::Connecting;
    let mut protocol_version = ProtocolVersion::V4;
    let mut client_id = String::new();
    let mut installed: Vec<(TopicFilter, HandlerId)> = Vec::new();
    let mut scratch = Vec::new();

    let result = run_loop(
        mux,
        &options,
        &conn,
        conn_id,
        &mut state,
        &mut protocol_version,
        &mut client_id,
        &mut installed,
        &mut scratch,
    );

    for (filter, id) in &installed {
        let _ = mux.remove(filter, *id);
    }
    if options.sys_events_enabled && !client_id.is_empty() {
        sys_event(mux, &client_id, "disconnected", None);
    }
    let mut guard = conn.lock().expect("session transport mutex poisoned");
    let _ = guard.close();

    result
}

#[allow(clippy::too_many_arguments)]
fn run_loop<T>(
    mux: &Arc<Mux>,
    options: &BrokerOptions,
    conn: &Arc<Mutex<T>>,
    conn_id: u64,
    state: &mut SessionState,
    protocol_version: &mut ProtocolVersion,
    client_id: &mut String,
    installed: &mut Vec<(TopicFilter, HandlerId)>,
    scratch: &mut Vec<u8>,
) -> Result<(), BrokerError>
where
    T: Transport + 'static,
{
    loop {
        match state {
            SessionState::Connecting => {
                let buf = {
                    let mut guard = conn.lock().expect("session transport mutex poisoned");
                    read_one_packet(&mut *guard, scratch)?
                };
                *protocol_version = codec::peek_protocol_version(&buf)?;
                match decode_inbound(&buf, *protocol_version)? {
                    Inbound::Connect {
                        client_id: cid,
                        keep_alive,
                        username,
                        clean_session,
                    } => {
                        let cid = match codec::validate_client_id(&cid) {
                            Ok(()) => cid,
                            Err(ClientIdError::Empty) if clean_session => codec::random_string(23),
                            Err(ClientIdError::Empty) => {
                                write_packet(conn, &connect_ack(*protocol_version, false))?;
                                return Err(BrokerError::Protocol(
                                    "client id is empty and clean session/start is not set".to_string(),
                                ));
                            }
                            // [MQTT-3.1.3-4] lets a server accept client ids
                            // outside the conservative [MQTT-3.1.3-5] subset;
                            // this broker does, so only emptiness is fatal.
                            Err(_) => cid,
                        };
                        *client_id = cid;
                        write_packet(conn, &connect_ack(*protocol_version, true))?;
                        if keep_alive > 0 {
                            let timeout = Duration::from_millis(u64::from(keep_alive) * 1500);
                            let mut guard = conn.lock().expect("session transport mutex poisoned");
                            guard.set_recv_timeout(Some(timeout))?;
                        }
                        if options.sys_events_enabled {
                            sys_event(mux, client_id, "connected", username.as_deref());
                        }
                        *state = SessionState::Connected;
                    }
                    _ => {
                        return Err(BrokerError::Protocol(
                            "first packet on a new connection must be CONNECT".to_string(),
                        ));
                    }
                }
            }
            SessionState::Connected => {
                let buf = {
                    let mut guard = conn.lock().expect("session transport mutex poisoned");
                    match read_one_packet(&mut *guard, scratch) {
                        Ok(buf) => buf,
                        Err(BrokerError::Transport(TransportError::Timeout)) => {
                            log::warn!("broker: keep-alive timeout for client {client_id}");
                            *state = SessionState::Closing;
                            continue;
                        }
                        Err(err) => return Err(err),
                    }
                };
                match decode_inbound(&buf, *protocol_version)? {
                    Inbound::Connect { .. } => {
                        return Err(BrokerError::Protocol("CONNECT received twice".to_string()));
                    }
                    Inbound::Publish { topic, payload } => {
                        let topic_name = TopicName::new(&topic)?;
                        let message = Message::new(topic, payload).with_origin(conn_id);
                        if let Err(err) = mux.dispatch(&topic_name, &message) {
                            log::warn!("broker: dropping publish, dispatch failed: {err}");
                        }
                    }
                    Inbound::Subscribe { packet_id, filters } => {
                        for (raw_filter, no_local) in &filters {
                            let filter = TopicFilter::new(raw_filter)?;
                            let conn_for_handler = Arc::clone(conn);
                            let proto = *protocol_version;
                            let no_local = *no_local;
                            let id = mux.handle(
                                &filter,
                                Box::new(move |msg: &Message| {
                                    if no_local && msg.origin == Some(conn_id) {
                                        return;
                                    }
                                    let packet = match forward_publish(proto, &msg.topic, &msg.payload) {
                                        Ok(packet) => packet,
                                        Err(err) => {
                                            log::warn!("broker: failed to encode forwarded publish: {err}");
                                            return;
                                        }
                                    };
                                    let mut out = Vec::new();
                                    if let Err(err) = codec::write_packet(&packet, &mut out) {
                                        log::warn!("broker: failed to serialize forwarded publish: {err}");
                                        return;
                                    }
                                    let mut guard = conn_for_handler
                                        .lock()
                                        .expect("session transport mutex poisoned");
                                    if let Err(err) = guard.send(&out) {
                                        log::warn!("broker: failed to forward publish to subscriber: {err}");
                                    }
                                }),
                            )?;
                            installed.push((filter, id));
                        }
                        write_packet(conn, &subscribe_ack(*protocol_version, packet_id, filters.len()))?;
                    }
                    Inbound::Unsubscribe { packet_id, filters } => {
                        for raw_filter in &filters {
                            if let Ok(filter) = TopicFilter::new(raw_filter) {
                                installed.retain(|(f, id)| {
                                    if f.as_str() == filter.as_str() {
                                        let _ = mux.remove(f, *id);
                                        false
                                    } else {
                                        true
                                    }
                                });
                            }
                        }
                        write_packet(conn, &unsubscribe_ack(*protocol_version, packet_id, filters.len()))?;
                    }
                    Inbound::PingRequest => {
                        write_packet(conn, &ping_response(*protocol_version))?;
                    }
                    Inbound::Disconnect => {
                        *state = SessionState::Closing;
                    }
                }
            }
            SessionState::Closing => return Ok(()),
        }
    }
}
