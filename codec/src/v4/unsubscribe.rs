use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, StringData, VarIntError,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsubscribePacket {
    packet_id: PacketId,
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
        2 + self
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
        let mut consumed = 2;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let packet = UnsubscribePacket::new(4, &["a/b", "a/#"]).unwrap();
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(UnsubscribePacket::decode(&mut ba).unwrap(), packet);
    }
}
