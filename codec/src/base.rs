use std::convert::TryFrom;

use crate::var_int::VarIntError;
use crate::{ByteArray, DecodeError, EncodeError, VarInt};

/// Packet identifier used to correlate SUBSCRIBE/SUBACK, UNSUBSCRIBE/UNSUBACK
/// and (when QoS 1/2 is in play) PUBLISH acknowledgements.
pub type PacketId = u16;

impl DecodePacket for PacketId {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        ba.read_u16()
    }
}

impl EncodePacket for PacketId {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push((*self >> 8) as u8);
        buf.push((*self & 0xff) as u8);
        Ok(2)
    }
}

#[must_use]
pub const fn packet_id_bytes() -> usize {
    2
}

/// MQTT protocol revision negotiated on CONNECT.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// MQTT 3.1.1.
    V4 = 4,
    /// MQTT 5.0.
    V5 = 5,
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::V4
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            _ => Err(DecodeError::InvalidProtocolLevel),
        }
    }
}

/// Message delivery guarantee. This crate only *routes* QoS 0 traffic end to
/// end; QoS 1/2 are still represented here so the codec can parse/encode a
/// complete wire stream.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(DecodeError::InvalidQoS),
        }
    }
}

/// Control packet type, taken from the upper nibble of the fixed header's
/// first byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PacketType {
    #[default]
    Connect = 1,
    ConnectAck = 2,
    Publish = 3,
    PublishAck = 4,
    PublishReceived = 5,
    PublishRelease = 6,
    PublishComplete = 7,
    Subscribe = 8,
    SubscribeAck = 9,
    Unsubscribe = 10,
    UnsubscribeAck = 11,
    PingRequest = 12,
    PingResponse = 13,
    Disconnect = 14,
    /// v5 only.
    Auth = 15,
}

impl PacketType {
    #[must_use]
    pub const fn from_nibble(v: u8) -> Option<Self> {
        Some(match v {
            1 => Self::Connect,
            2 => Self::ConnectAck,
            3 => Self::Publish,
            4 => Self::PublishAck,
            5 => Self::PublishReceived,
            6 => Self::PublishRelease,
            7 => Self::PublishComplete,
            8 => Self::Subscribe,
            9 => Self::SubscribeAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubscribeAck,
            12 => Self::PingRequest,
            13 => Self::PingResponse,
            14 => Self::Disconnect,
            15 => Self::Auth,
            _ => return None,
        })
    }

    /// Reserved flag bits required in the lower nibble for this packet type,
    /// per the MQTT spec's fixed header table (PUBLISH is special-cased by
    /// the caller since its flags carry DUP/QoS/RETAIN).
    const fn required_flags(self) -> Option<u8> {
        match self {
            Self::Connect
            | Self::ConnectAck
            | Self::PublishAck
            | Self::PublishComplete
            | Self::SubscribeAck
            | Self::UnsubscribeAck
            | Self::PingRequest
            | Self::PingResponse
            | Self::Disconnect
            | Self::Auth => Some(0b0000),
            Self::Publish => None,
            Self::PublishReceived | Self::PublishRelease | Self::Subscribe | Self::Unsubscribe => {
                Some(0b0010)
            }
        }
    }

    /// Validate `flags` (lower nibble of the first fixed-header byte) for
    /// this packet type, returning the QoS/DUP/RETAIN triple when the type
    /// is PUBLISH.
    pub(crate) fn validate_flags(self, flags: u8) -> Result<(), DecodeError> {
        if self == Self::Publish {
            let qos_bits = (flags & 0b0110) >> 1;
            if qos_bits == 3 {
                log::error!("PUBLISH packet carries reserved QoS value 3");
                return Err(DecodeError::InvalidQoS);
            }
            return Ok(());
        }
        if let Some(expected) = self.required_flags() {
            if flags != expected {
                log::error!(
                    "packet type {:?} has invalid flags {:#06b}, expected {:#06b}",
                    self,
                    flags,
                    expected
                );
                return Err(DecodeError::InvalidPacketFlags);
            }
        }
        Ok(())
    }
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> u8 {
        (t as u8) << 4
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let nibble = (byte & 0b1111_0000) >> 4;
        let flags = byte & 0b0000_1111;
        let packet_type = Self::from_nibble(nibble).ok_or_else(|| {
            log::error!("unknown packet type nibble {}", nibble);
            DecodeError::InvalidPacketType
        })?;
        packet_type.validate_flags(flags)?;
        Ok(packet_type)
    }
}

/// Trait implemented by every owned packet struct.
pub trait Packet {
    fn packet_type(&self) -> PacketType;
}

/// Deserialize `Self` from a `ByteArray` cursor. For full packets this
/// includes decoding the fixed header; for primitive wire types it is just
/// the type's own bytes.
pub trait DecodePacket: Sized {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError>;
}

/// Serialize `Self` by appending its wire bytes to `buf`, returning the
/// number of bytes written.
pub trait EncodePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError>;
}

/// Fixed header shared by every MQTT control packet: packet type + flags in
/// the first byte, followed by the "Remaining Length" variable integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedHeader {
    packet_type: PacketType,
    flags: u8,
    remaining_length: VarInt,
}

impl FixedHeader {
    pub fn new(packet_type: PacketType, remaining_length: usize) -> Result<Self, VarIntError> {
        Ok(Self {
            packet_type,
            flags: default_flags(packet_type),
            remaining_length: VarInt::new(remaining_length)?,
        })
    }

    pub fn with_flags(
        packet_type: PacketType,
        flags: u8,
        remaining_length: usize,
    ) -> Result<Self, VarIntError> {
        Ok(Self {
            packet_type,
            flags,
            remaining_length: VarInt::new(remaining_length)?,
        })
    }

    #[must_use]
    pub const fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    #[must_use]
    pub const fn remaining_length(&self) -> usize {
        self.remaining_length.value()
    }

    /// Bytes the fixed header itself occupies (type+flags byte + varint).
    #[must_use]
    pub const fn bytes(&self) -> usize {
        1 + self.remaining_length.bytes()
    }
}

const fn default_flags(packet_type: PacketType) -> u8 {
    match packet_type {
        PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe => 0b0010,
        _ => 0,
    }
}

impl DecodePacket for FixedHeader {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let byte = ba.read_byte()?;
        let packet_type = PacketType::try_from(byte)?;
        let flags = byte & 0b0000_1111;
        let remaining_length = VarInt::decode(ba)?;
        if ba.remaining_bytes() < remaining_length.value() {
            return Err(DecodeError::InvalidRemainingLength);
        }
        Ok(Self {
            packet_type,
            flags,
            remaining_length,
        })
    }
}

impl EncodePacket for FixedHeader {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let type_byte: u8 = self.packet_type.into();
        buf.push(type_byte | self.flags);
        self.remaining_length.encode(buf)?;
        Ok(buf.len() - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_connect_header() {
        let buf = vec![0x10, 0x0c];
        let mut ba = ByteArray::new(&buf);
        let header = FixedHeader::decode(&mut ba).unwrap();
        assert_eq!(header.packet_type(), PacketType::Connect);
        assert_eq!(header.remaining_length(), 12);
    }

    #[test]
    fn reject_bad_connack_flags() {
        let buf = vec![0x21, 0x02];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(FixedHeader::decode(&mut ba), Err(DecodeError::InvalidPacketFlags));
    }

    #[test]
    fn reject_reserved_publish_qos() {
        let buf = vec![0x36, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(FixedHeader::decode(&mut ba), Err(DecodeError::InvalidQoS));
    }

    #[test]
    fn encode_roundtrip() {
        let header = FixedHeader::new(PacketType::Publish, 300).unwrap();
        let mut buf = Vec::new();
        header.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = FixedHeader::decode(&mut ba).unwrap();
        assert_eq!(decoded, header);
    }
}
