use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use codec::{v4, v5, EncodePacket, Packet, PacketId, ProtocolVersion, QoS, TopicName};
use mux::{Message, Mux};
use transport::{Transport, TransportError};

use crate::error::ClientError;
use crate::options::ClientOptions;

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

/// Inline scratch-buffer threshold below which a packet payload is copied
/// into a reused buffer instead of a fresh allocation, matching the
/// broker's own framing budget.
const INLINE_PAYLOAD_CAP: usize = 4096;

/// Read one full MQTT control packet off `transport`. `scratch` is reused
/// across calls for payloads up to [`INLINE_PAYLOAD_CAP`]; only a payload
/// larger than that gets its own fresh allocation.
fn read_one_packet<T: Transport>(transport: &mut T, scratch: &mut Vec<u8>) -> Result<Vec<u8>, ClientError> {
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
            return Err(codec::DecodeError::InvalidRemainingLength.into());
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

fn connect_packet(options: &ClientOptions) -> Result<Packet, ClientError> {
    Ok(match options.protocol_version {
        ProtocolVersion::V4 => {
            let mut packet = v4::ConnectPacket::new(&options.client_id)?;
            packet.set_keep_alive(options.keep_alive);
            if let Some(username) = &options.username {
                packet.set_username(username)?;
            }
            if let Some(password) = &options.password {
                packet.set_password(password)?;
            }
            Packet::V4Connect(packet)
        }
        ProtocolVersion::V5 => {
            let mut packet = v5::ConnectPacket::new(&options.client_id)?;
            packet.set_keep_alive(options.keep_alive);
            if let Some(username) = &options.username {
                packet.set_username(username)?;
            }
            if let Some(password) = &options.password {
                packet.set_password(password)?;
            }
            Packet::V5Connect(packet)
        }
    })
}

fn subscribe_packet(protocol_version: ProtocolVersion, packet_id: PacketId, filters: &[(String, QoS)]) -> Result<Packet, ClientError> {
    Ok(match protocol_version {
        ProtocolVersion::V4 => {
            let topics = filters
                .iter()
                .map(|(filter, qos)| v4::SubscribeTopic::new(filter, *qos))
                .collect::<Result<Vec<_>, _>>()?;
            Packet::V4Subscribe(v4::SubscribePacket::new(packet_id, topics))
        }
        ProtocolVersion::V5 => {
            let topics = filters
                .iter()
                .map(|(filter, qos)| v5::SubscribeTopic::new(filter, v5::SubscribeOptions::new(*qos)))
                .collect::<Result<Vec<_>, _>>()?;
            Packet::V5Subscribe(v5::SubscribePacket::new(packet_id, topics))
        }
    })
}

fn unsubscribe_packet(protocol_version: ProtocolVersion, packet_id: PacketId, filters: &[String]) -> Result<Packet, ClientError> {
    let refs: Vec<&str> = filters.iter().map(String::as_str).collect();
    Ok(match protocol_version {
        ProtocolVersion::V4 => Packet::V4Unsubscribe(v4::UnsubscribePacket::new(packet_id, &refs)?),
        ProtocolVersion::V5 => Packet::V5Unsubscribe(v5::UnsubscribePacket::new(packet_id, &refs)?),
    })
}

fn publish_packet(protocol_version: ProtocolVersion, topic: &str, payload: &[u8]) -> Result<Packet, ClientError> {
    Ok(match protocol_version {
        ProtocolVersion::V4 => Packet::V4Publish(v4::PublishPacket::new(topic, QoS::AtMostOnce, payload)?),
        ProtocolVersion::V5 => Packet::V5Publish(v5::PublishPacket::new(topic, QoS::AtMostOnce, payload)?),
    })
}

fn ping_request_packet(protocol_version: ProtocolVersion) -> Packet {
    match protocol_version {
        ProtocolVersion::V4 => Packet::V4PingRequest(v4::PingRequestPacket::new()),
        ProtocolVersion::V5 => Packet::V5PingRequest(v5::PingRequestPacket::new()),
    }
}

/// A connected MQTT client. Reads are driven entirely by [`Client::poll`];
/// there is no background thread, matching the teacher's `ruo::sync_client`
/// but inverted from its own `start()` loop into caller-driven polling so a
/// single thread can interleave several clients (or a client and other
/// work).
pub struct Client<T: Transport> {
    transport: T,
    mux: Arc<Mux>,
    options: ClientOptions,
    subscribed_filters: HashMap<String, QoS>,
    next_packet_id: PacketId,
    scratch: Vec<u8>,
}

impl<T: Transport> Client<T> {
    /// Perform the CONNECT/CONNACK handshake and return a ready client.
    pub fn connect(mut transport: T, mux: Arc<Mux>, options: ClientOptions) -> Result<Self, ClientError> {
        if let Some(timeout) = options.connect_timeout {
            transport.set_recv_timeout(Some(timeout))?;
        }

        let mut buf = Vec::new();
        codec::write_packet(&connect_packet(&options)?, &mut buf)?;
        transport.send(&buf)?;

        let mut scratch = Vec::new();
        let ack_buf = read_one_packet(&mut transport, &mut scratch)?;
        let ack = codec::read_packet(&ack_buf, options.protocol_version)?;
        match ack {
            Packet::V4ConnectAck(p) if p.return_code() == v4::ConnectReturnCode::Accepted => {}
            Packet::V5ConnectAck(p) if p.reason_code() == v5::ConnectReasonCode::Success => {}
            Packet::V4ConnectAck(p) => {
                return Err(ClientError::ConnectRefused(format!("{:?}", p.return_code())));
            }
            Packet::V5ConnectAck(p) => {
                return Err(ClientError::ConnectRefused(format!("{:?}", p.reason_code())));
            }
            other => {
                return Err(ClientError::ConnectRefused(format!("unexpected reply: {other:?}")));
            }
        }

        if options.keep_alive > 0 {
            let timeout = Duration::from_millis(u64::from(options.keep_alive) * 1500);
            transport.set_recv_timeout(Some(timeout))?;
        }

        Ok(Self {
            transport,
            mux,
            options,
            subscribed_filters: HashMap::new(),
            next_packet_id: 1,
            scratch,
        })
    }

    fn next_packet_id(&mut self) -> PacketId {
        if self.next_packet_id == PacketId::MAX {
            self.next_packet_id = 1;
        } else {
            self.next_packet_id += 1;
        }
        self.next_packet_id
    }

    fn send(&mut self, packet: &Packet) -> Result<(), ClientError> {
        let mut buf = Vec::new();
        codec::write_packet(packet, &mut buf)?;
        self.transport.send(&buf)?;
        Ok(())
    }

    /// Send SUBSCRIBE for `filters` and remember them so [`Client::reconnect`]
    /// can re-request them after a fresh handshake. Delivery of matching
    /// publishes happens through whatever handlers the caller has already
    /// registered on the shared `mux`, independent of this call.
    pub fn subscribe(&mut self, filters: &[(&str, QoS)]) -> Result<(), ClientError> {
        let packet_id = self.next_packet_id();
        let owned: Vec<(String, QoS)> = filters.iter().map(|(f, q)| (f.to_string(), *q)).collect();
        let packet = subscribe_packet(self.options.protocol_version, packet_id, &owned)?;
        self.send(&packet)?;
        for (filter, qos) in owned {
            self.subscribed_filters.insert(filter, qos);
        }
        Ok(())
    }

    pub fn unsubscribe(&mut self, filters: &[&str]) -> Result<(), ClientError> {
        let packet_id = self.next_packet_id();
        let owned: Vec<String> = filters.iter().map(|f| (*f).to_string()).collect();
        let packet = unsubscribe_packet(self.options.protocol_version, packet_id, &owned)?;
        self.send(&packet)?;
        for filter in &owned {
            self.subscribed_filters.remove(filter);
        }
        Ok(())
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ClientError> {
        let packet = publish_packet(self.options.protocol_version, topic, payload)?;
        self.send(&packet)
    }

    fn ping(&mut self) -> Result<(), ClientError> {
        let packet = ping_request_packet(self.options.protocol_version);
        self.send(&packet)
    }

    /// Read and dispatch one packet, blocking for at most `timeout`. Returns
    /// `Ok(true)` if a packet was processed, `Ok(false)` if the timeout
    /// elapsed with nothing to read.
    pub fn poll(&mut self, timeout: Duration) -> Result<bool, ClientError> {
        self.transport.set_recv_timeout(Some(timeout))?;
        let buf = match read_one_packet(&mut self.transport, &mut self.scratch) {
            Ok(buf) => buf,
            Err(ClientError::Transport(TransportError::Timeout)) => return Ok(false),
            Err(err) => return Err(err),
        };
        let packet = codec::read_packet(&buf, self.options.protocol_version)?;
        match packet {
            Packet::V4Publish(p) => self.dispatch_publish(p.topic(), p.payload())?,
            Packet::V5Publish(p) => self.dispatch_publish(p.topic(), p.payload())?,
            Packet::V4PingResponse(_) | Packet::V5PingResponse(_) => {
                log::debug!("client: ping response received");
            }
            Packet::V4SubscribeAck(p) => {
                log::debug!("client: subscribe ack for packet id {}", p.packet_id());
            }
            Packet::V5SubscribeAck(p) => {
                log::debug!("client: subscribe ack for packet id {}", p.packet_id());
            }
            Packet::V4UnsubscribeAck(p) => {
                log::debug!("client: unsubscribe ack for packet id {}", p.packet_id());
            }
            Packet::V5UnsubscribeAck(p) => {
                log::debug!("client: unsubscribe ack for packet id {}", p.packet_id());
            }
            Packet::V4Disconnect(_) | Packet::V5Disconnect(_) => {
                log::warn!("client: server sent DISCONNECT");
            }
            other => {
                log::warn!("client: unexpected packet from server: {other:?}");
            }
        }
        Ok(true)
    }

    fn dispatch_publish(&self, topic: &str, payload: &[u8]) -> Result<(), ClientError> {
        let topic_name = TopicName::new(topic)?;
        let message = Message::new(topic, Bytes::copy_from_slice(payload));
        self.mux.dispatch(&topic_name, &message)?;
        Ok(())
    }

    /// Replace the transport, re-run the handshake, and re-issue SUBSCRIBE
    /// for every filter recorded by a prior [`Client::subscribe`]. Handlers
    /// registered on the shared mux need no action: they were never tied to
    /// the old transport.
    pub fn reconnect(&mut self, mut new_transport: T) -> Result<(), ClientError> {
        if let Some(timeout) = self.options.connect_timeout {
            new_transport.set_recv_timeout(Some(timeout))?;
        }
        let mut buf = Vec::new();
        codec::write_packet(&connect_packet(&self.options)?, &mut buf)?;
        new_transport.send(&buf)?;

        let ack_buf = read_one_packet(&mut new_transport, &mut self.scratch)?;
        let ack = codec::read_packet(&ack_buf, self.options.protocol_version)?;
        let accepted = matches!(
            ack,
            Packet::V4ConnectAck(ref p) if p.return_code() == v4::ConnectReturnCode::Accepted
        ) || matches!(
            ack,
            Packet::V5ConnectAck(ref p) if p.reason_code() == v5::ConnectReasonCode::Success
        );
        if !accepted {
            return Err(ClientError::ConnectRefused(format!("{ack:?}")));
        }

        if self.options.keep_alive > 0 {
            let timeout = Duration::from_millis(u64::from(self.options.keep_alive) * 1500);
            new_transport.set_recv_timeout(Some(timeout))?;
        }
        self.transport = new_transport;

        if !self.subscribed_filters.is_empty() {
            let packet_id = self.next_packet_id();
            let filters: Vec<(String, QoS)> = self
                .subscribed_filters
                .iter()
                .map(|(f, q)| (f.clone(), *q))
                .collect();
            let packet = subscribe_packet(self.options.protocol_version, packet_id, &filters)?;
            self.send(&packet)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.options.client_id
    }
}
