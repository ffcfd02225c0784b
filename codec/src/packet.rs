use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketType,
    ProtocolVersion, StringData,
};
use crate::{v4, v5};

/// A fully decoded MQTT control packet, tagged by protocol version. The
/// codec never merges v4 and v5 representations: callers branch on this enum
/// and get back the packet type native to the connection's negotiated
/// version.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    V4Connect(v4::ConnectPacket),
    V4ConnectAck(v4::ConnectAckPacket),
    V4Publish(v4::PublishPacket),
    V4PublishAck(v4::PublishAckPacket),
    V4PublishReceived(v4::PublishReceivedPacket),
    V4PublishRelease(v4::PublishReleasePacket),
    V4PublishComplete(v4::PublishCompletePacket),
    V4Subscribe(v4::SubscribePacket),
    V4SubscribeAck(v4::SubscribeAckPacket),
    V4Unsubscribe(v4::UnsubscribePacket),
    V4UnsubscribeAck(v4::UnsubscribeAckPacket),
    V4PingRequest(v4::PingRequestPacket),
    V4PingResponse(v4::PingResponsePacket),
    V4Disconnect(v4::DisconnectPacket),

    V5Connect(v5::ConnectPacket),
    V5ConnectAck(v5::ConnectAckPacket),
    V5Publish(v5::PublishPacket),
    V5PublishAck(v5::PublishAckPacket),
    V5PublishReceived(v5::PublishReceivedPacket),
    V5PublishRelease(v5::PublishReleasePacket),
    V5PublishComplete(v5::PublishCompletePacket),
    V5Subscribe(v5::SubscribePacket),
    V5SubscribeAck(v5::SubscribeAckPacket),
    V5Unsubscribe(v5::UnsubscribePacket),
    V5UnsubscribeAck(v5::UnsubscribeAckPacket),
    V5PingRequest(v5::PingRequestPacket),
    V5PingResponse(v5::PingResponsePacket),
    V5Disconnect(v5::DisconnectPacket),
    V5Auth(v5::AuthPacket),
}

impl Packet {
    #[must_use]
    pub const fn protocol_version(&self) -> ProtocolVersion {
        match self {
            Self::V4Connect(_)
            | Self::V4ConnectAck(_)
            | Self::V4Publish(_)
            | Self::V4PublishAck(_)
            | Self::V4PublishReceived(_)
            | Self::V4PublishRelease(_)
            | Self::V4PublishComplete(_)
            | Self::V4Subscribe(_)
            | Self::V4SubscribeAck(_)
            | Self::V4Unsubscribe(_)
            | Self::V4UnsubscribeAck(_)
            | Self::V4PingRequest(_)
            | Self::V4PingResponse(_)
            | Self::V4Disconnect(_) => ProtocolVersion::V4,
            Self::V5Connect(_)
            | Self::V5ConnectAck(_)
            | Self::V5Publish(_)
            | Self::V5PublishAck(_)
            | Self::V5PublishReceived(_)
            | Self::V5PublishRelease(_)
            | Self::V5PublishComplete(_)
            | Self::V5Subscribe(_)
            | Self::V5SubscribeAck(_)
            | Self::V5Unsubscribe(_)
            | Self::V5UnsubscribeAck(_)
            | Self::V5PingRequest(_)
            | Self::V5PingResponse(_)
            | Self::V5Disconnect(_)
            | Self::V5Auth(_) => ProtocolVersion::V5,
        }
    }
}

/// Peek the fixed header's type nibble (without consuming anything, since
/// every `DecodePacket` impl re-reads the fixed header itself) and dispatch
/// to the packet type's own decoder for `protocol_version`.
pub fn read_packet(buf: &[u8], protocol_version: ProtocolVersion) -> Result<Packet, DecodeError> {
    let mut peek = ByteArray::new(buf);
    let first_byte = peek.peek_byte()?;
    let packet_type = PacketType::try_from(first_byte)?;

    let mut ba = ByteArray::new(buf);
    Ok(match (protocol_version, packet_type) {
        (ProtocolVersion::V4, PacketType::Connect) => Packet::V4Connect(v4::ConnectPacket::decode(&mut ba)?),
        (ProtocolVersion::V4, PacketType::ConnectAck) => {
            Packet::V4ConnectAck(v4::ConnectAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::Publish) => Packet::V4Publish(v4::PublishPacket::decode(&mut ba)?),
        (ProtocolVersion::V4, PacketType::PublishAck) => {
            Packet::V4PublishAck(v4::PublishAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::PublishReceived) => {
            Packet::V4PublishReceived(v4::PublishReceivedPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::PublishRelease) => {
            Packet::V4PublishRelease(v4::PublishReleasePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::PublishComplete) => {
            Packet::V4PublishComplete(v4::PublishCompletePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::Subscribe) => {
            Packet::V4Subscribe(v4::SubscribePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::SubscribeAck) => {
            Packet::V4SubscribeAck(v4::SubscribeAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::Unsubscribe) => {
            Packet::V4Unsubscribe(v4::UnsubscribePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::UnsubscribeAck) => {
            Packet::V4UnsubscribeAck(v4::UnsubscribeAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::PingRequest) => {
            Packet::V4PingRequest(v4::PingRequestPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::PingResponse) => {
            Packet::V4PingResponse(v4::PingResponsePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::Disconnect) => {
            Packet::V4Disconnect(v4::DisconnectPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V4, PacketType::Auth) => return Err(DecodeError::InvalidPacketType),

        (ProtocolVersion::V5, PacketType::Connect) => Packet::V5Connect(v5::ConnectPacket::decode(&mut ba)?),
        (ProtocolVersion::V5, PacketType::ConnectAck) => {
            Packet::V5ConnectAck(v5::ConnectAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::Publish) => Packet::V5Publish(v5::PublishPacket::decode(&mut ba)?),
        (ProtocolVersion::V5, PacketType::PublishAck) => {
            Packet::V5PublishAck(v5::PublishAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::PublishReceived) => {
            Packet::V5PublishReceived(v5::PublishReceivedPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::PublishRelease) => {
            Packet::V5PublishRelease(v5::PublishReleasePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::PublishComplete) => {
            Packet::V5PublishComplete(v5::PublishCompletePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::Subscribe) => {
            Packet::V5Subscribe(v5::SubscribePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::SubscribeAck) => {
            Packet::V5SubscribeAck(v5::SubscribeAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::Unsubscribe) => {
            Packet::V5Unsubscribe(v5::UnsubscribePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::UnsubscribeAck) => {
            Packet::V5UnsubscribeAck(v5::UnsubscribeAckPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::PingRequest) => {
            Packet::V5PingRequest(v5::PingRequestPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::PingResponse) => {
            Packet::V5PingResponse(v5::PingResponsePacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::Disconnect) => {
            Packet::V5Disconnect(v5::DisconnectPacket::decode(&mut ba)?)
        }
        (ProtocolVersion::V5, PacketType::Auth) => Packet::V5Auth(v5::AuthPacket::decode(&mut ba)?),
    })
}

/// Inspect a CONNECT packet's variable header far enough to learn the
/// protocol level it declares, without committing to a v4 or v5 decode of
/// the rest of the packet. Used by a broker accepting connections of either
/// version: it must know which decoder to hand the buffer to before it can
/// call [`read_packet`].
///
/// # Errors
///
/// Returns `DecodeError::InvalidPacketType` if the first packet is not
/// CONNECT, and any decode error the fixed header or protocol-name string
/// itself would raise.
pub fn peek_protocol_version(buf: &[u8]) -> Result<ProtocolVersion, DecodeError> {
    let mut ba = ByteArray::new(buf);
    let fixed_header = FixedHeader::decode(&mut ba)?;
    if fixed_header.packet_type() != PacketType::Connect {
        return Err(DecodeError::InvalidPacketType);
    }
    let protocol_name_len = ba.read_u16()? as usize;
    let _protocol_name = ba.read_string(protocol_name_len)?;
    let level = ba.read_byte()?;
    ProtocolVersion::try_from(level)
}

pub fn write_packet(packet: &Packet, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
    match packet {
        Packet::V4Connect(p) => p.encode(buf),
        Packet::V4ConnectAck(p) => p.encode(buf),
        Packet::V4Publish(p) => p.encode(buf),
        Packet::V4PublishAck(p) => p.encode(buf),
        Packet::V4PublishReceived(p) => p.encode(buf),
        Packet::V4PublishRelease(p) => p.encode(buf),
        Packet::V4PublishComplete(p) => p.encode(buf),
        Packet::V4Subscribe(p) => p.encode(buf),
        Packet::V4SubscribeAck(p) => p.encode(buf),
        Packet::V4Unsubscribe(p) => p.encode(buf),
        Packet::V4UnsubscribeAck(p) => p.encode(buf),
        Packet::V4PingRequest(p) => p.encode(buf),
        Packet::V4PingResponse(p) => p.encode(buf),
        Packet::V4Disconnect(p) => p.encode(buf),

        Packet::V5Connect(p) => p.encode(buf),
        Packet::V5ConnectAck(p) => p.encode(buf),
        Packet::V5Publish(p) => p.encode(buf),
        Packet::V5PublishAck(p) => p.encode(buf),
        Packet::V5PublishReceived(p) => p.encode(buf),
        Packet::V5PublishRelease(p) => p.encode(buf),
        Packet::V5PublishComplete(p) => p.encode(buf),
        Packet::V5Subscribe(p) => p.encode(buf),
        Packet::V5SubscribeAck(p) => p.encode(buf),
        Packet::V5Unsubscribe(p) => p.encode(buf),
        Packet::V5UnsubscribeAck(p) => p.encode(buf),
        Packet::V5PingRequest(p) => p.encode(buf),
        Packet::V5PingResponse(p) => p.encode(buf),
        Packet::V5Disconnect(p) => p.encode(buf),
        Packet::V5Auth(p) => p.encode(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QoS;

    #[test]
    fn roundtrip_v4_publish_through_top_level_dispatch() {
        let inner = v4::PublishPacket::new("a/b", QoS::AtMostOnce, b"hi").unwrap();
        let packet = Packet::V4Publish(inner);
        let mut buf = Vec::new();
        write_packet(&packet, &mut buf).unwrap();
        let decoded = read_packet(&buf, ProtocolVersion::V4).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn roundtrip_v5_connect_through_top_level_dispatch() {
        let inner = v5::ConnectPacket::new("client-v5").unwrap();
        let packet = Packet::V5Connect(inner);
        let mut buf = Vec::new();
        write_packet(&packet, &mut buf).unwrap();
        let decoded = read_packet(&buf, ProtocolVersion::V5).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn peek_protocol_version_distinguishes_v4_and_v5_connect() {
        let mut v4_buf = Vec::new();
        v4::ConnectPacket::new("client-v4").unwrap().encode(&mut v4_buf).unwrap();
        assert_eq!(peek_protocol_version(&v4_buf).unwrap(), ProtocolVersion::V4);

        let mut v5_buf = Vec::new();
        v5::ConnectPacket::new("client-v5").unwrap().encode(&mut v5_buf).unwrap();
        assert_eq!(peek_protocol_version(&v5_buf).unwrap(), ProtocolVersion::V5);
    }

    #[test]
    fn peek_protocol_version_rejects_non_connect_first_packet() {
        let mut buf = Vec::new();
        v4::PingRequestPacket::new().encode(&mut buf).unwrap();
        assert_eq!(
            peek_protocol_version(&buf).unwrap_err(),
            DecodeError::InvalidPacketType
        );
    }

    #[test]
    fn v5_auth_not_valid_under_v4() {
        let mut buf = Vec::new();
        v5::AuthPacket::default().encode(&mut buf).unwrap();
        assert_eq!(
            read_packet(&buf, ProtocolVersion::V4).unwrap_err(),
            DecodeError::InvalidPacketType
        );
    }
}
