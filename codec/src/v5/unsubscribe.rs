use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, StringData, VarIntError,
};

const UNSUBSCRIBE_PROPERTIES: &[PropertyId] = &[PropertyId::UserProperty];
const UNSUBACK_PROPERTIES: &[PropertyId] = &[PropertyId::ReasonString, PropertyId::UserProperty];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribePacket {
    packet_id: PacketId,
    properties: Properties,
    topic_filters: Vec<StringData>,
}

impl UnsubscribePacket {
    pub fn new(packet_id: PacketId, topic_filters: &[&str]) -> Result<Self, EncodeError> {
        let topic_filters = topic_filters
            .iter()
            .map(|t| StringData::from(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            packet_id,
            properties: Properties::new(),
            topic_filters,
        })
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    pub fn topic_filters(&self) -> impl Iterator<Item = &str> {
        self.topic_filters.iter().map(AsRef::as_ref)
    }

    fn remaining_length(&self) -> usize {
        2 + self.properties.encoded_len()
            + self
                .topic_filters
                .iter()
                .map(StringData::bytes)
                .sum::<usize>()
    }
}

impl PacketTrait for UnsubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Unsubscribe
    }
}

impl DecodePacket for UnsubscribePacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Unsubscribe {
            return Err(DecodeError::InvalidPacketType);
        }
        let packet_id = PacketId::decode(ba)?;
        let start_offset = ba.offset();
        let properties = Properties::decode_allowed(ba, UNSUBSCRIBE_PROPERTIES)?;
        let mut consumed = 2 + (ba.offset() - start_offset);

        let mut topic_filters = Vec::new();
        while consumed < fixed_header.remaining_length() {
            let topic_filter = StringData::decode(ba)?;
            consumed += topic_filter.bytes();
            topic_filters.push(topic_filter);
        }
        if topic_filters.is_empty() {
            return Err(DecodeError::EmptyTopicFilter);
        }
        Ok(Self {
            packet_id,
            properties,
            topic_filters,
        })
    }
}

impl EncodePacket for UnsubscribePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header =
            FixedHeader::with_flags(PacketType::Unsubscribe, 0b0010, self.remaining_length())?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        self.properties.encode(buf)?;
        for topic_filter in &self.topic_filters {
            topic_filter.encode(buf)?;
        }
        Ok(buf.len() - start)
    }
}

impl UnsubscribePacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Unsubscribe, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribeAckPacket {
    packet_id: PacketId,
    properties: Properties,
    reasons: Vec<u8>,
}

impl UnsubscribeAckPacket {
    #[must_use]
    pub fn new(packet_id: PacketId, reasons: Vec<u8>) -> Self {
        Self {
            packet_id,
            properties: Properties::new(),
            reasons,
        }
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    fn remaining_length(&self) -> usize {
        2 + self.properties.encoded_len() + self.reasons.len()
    }
}

impl PacketTrait for UnsubscribeAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::UnsubscribeAck
    }
}

impl DecodePacket for UnsubscribeAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::UnsubscribeAck {
            return Err(DecodeError::InvalidPacketType);
        }
        let packet_id = PacketId::decode(ba)?;
        let start_offset = ba.offset();
        let properties = Properties::decode_allowed(ba, UNSUBACK_PROPERTIES)?;
        let consumed = 2 + (ba.offset() - start_offset);
        let reason_count = fixed_header
            .remaining_length()
            .checked_sub(consumed)
            .ok_or(DecodeError::InvalidRemainingLength)?;
        let mut reasons = Vec::with_capacity(reason_count);
        for _ in 0..reason_count {
            reasons.push(ba.read_byte()?);
        }
        Ok(Self {
            packet_id,
            properties,
            reasons,
        })
    }
}

impl EncodePacket for UnsubscribeAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::UnsubscribeAck, self.remaining_length())?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        self.properties.encode(buf)?;
        buf.extend_from_slice(&self.reasons);
        Ok(buf.len() - start)
    }
}

impl UnsubscribeAckPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::UnsubscribeAck, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}
