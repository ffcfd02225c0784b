use bytes::Bytes;

use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, QoS, StringData, VarIntError,
};

const PUBLISH_PROPERTIES: &[PropertyId] = &[
    PropertyId::PayloadFormatIndicator,
    PropertyId::MessageExpiryInterval,
    PropertyId::ContentType,
    PropertyId::ResponseTopic,
    PropertyId::CorrelationData,
    PropertyId::SubscriptionIdentifier,
    PropertyId::TopicAlias,
    PropertyId::UserProperty,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishPacket {
    dup: bool,
    qos: QoS,
    retain: bool,
    topic: StringData,
    packet_id: Option<PacketId>,
    properties: Properties,
    payload: Bytes,
}

impl PublishPacket {
    pub fn new(topic: &str, qos: QoS, payload: &[u8]) -> Result<Self, EncodeError> {
        Ok(Self {
            dup: false,
            qos,
            retain: false,
            topic: StringData::from(topic)?,
            packet_id: None,
            properties: Properties::new(),
            payload: Bytes::copy_from_slice(payload),
        })
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.as_ref()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn set_packet_id(&mut self, packet_id: PacketId) -> &mut Self {
        self.packet_id = Some(packet_id);
        self
    }

    fn remaining_length(&self) -> usize {
        let mut len = self.topic.bytes() + self.properties.encoded_len() + self.payload.len();
        if self.packet_id.is_some() {
            len += 2;
        }
        len
    }
}

impl PacketTrait for PublishPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Publish
    }
}

impl DecodePacket for PublishPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Publish {
            return Err(DecodeError::InvalidPacketType);
        }
        let flags = fixed_header.flags();
        let dup = flags & 0b1000 != 0;
        let retain = flags & 0b0001 != 0;
        let qos = QoS::try_from((flags & 0b0110) >> 1)?;
        if qos == QoS::AtMostOnce && dup {
            return Err(DecodeError::InvalidPacketFlags);
        }

        let start_offset = ba.offset();
        let topic = StringData::decode(ba)?;
        let packet_id = if qos == QoS::AtMostOnce {
            None
        } else {
            Some(PacketId::decode(ba)?)
        };
        let properties = Properties::decode_allowed(ba, PUBLISH_PROPERTIES)?;

        let consumed = ba.offset() - start_offset;
        let payload_len = fixed_header
            .remaining_length()
            .checked_sub(consumed)
            .ok_or(DecodeError::InvalidRemainingLength)?;
        let payload = Bytes::copy_from_slice(ba.read_bytes(payload_len)?);

        Ok(Self {
            dup,
            qos,
            retain,
            topic,
            packet_id,
            properties,
            payload,
        })
    }
}

impl EncodePacket for PublishPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let flags = (u8::from(self.dup) << 3) | ((self.qos as u8) << 1) | u8::from(self.retain);
        let fixed_header =
            FixedHeader::with_flags(PacketType::Publish, flags, self.remaining_length())?;
        fixed_header.encode(buf)?;
        self.topic.encode(buf)?;
        if let Some(packet_id) = self.packet_id {
            packet_id.encode(buf)?;
        }
        self.properties.encode(buf)?;
        buf.extend_from_slice(&self.payload);
        Ok(buf.len() - start)
    }
}

impl PublishPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Publish, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_qos0() {
        let packet = PublishPacket::new("a/b", QoS::AtMostOnce, b"hi").unwrap();
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PublishPacket::decode(&mut ba).unwrap(), packet);
    }
}
