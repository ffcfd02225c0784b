use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, QoS, StringData, VarIntError,
};

const SUBSCRIBE_PROPERTIES: &[PropertyId] =
    &[PropertyId::SubscriptionIdentifier, PropertyId::UserProperty];

/// Subscribe options: QoS plus the v5-only no-local / retain-as-published /
/// retain-handling bits, packed into a single byte on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscribeOptions {
    qos: QoS,
    no_local: bool,
    retain_as_published: bool,
    retain_handling: u8,
}

impl SubscribeOptions {
    #[must_use]
    pub const fn new(qos: QoS) -> Self {
        Self {
            qos,
            no_local: false,
            retain_as_published: false,
            retain_handling: 0,
        }
    }

    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    /// Whether the subscriber asked not to receive its own publishes back
    /// [MQTT-3.8.3-3].
    #[must_use]
    pub const fn no_local(&self) -> bool {
        self.no_local
    }

    pub fn set_no_local(&mut self, no_local: bool) -> &mut Self {
        self.no_local = no_local;
        self
    }

    fn decode(byte: u8) -> Result<Self, DecodeError> {
        let retain_handling = (byte & 0b0011_0000) >> 4;
        if retain_handling > 2 || byte & 0b1100_0000 != 0 {
            return Err(DecodeError::InvalidPacketFlags);
        }
        Ok(Self {
            qos: QoS::try_from(byte & 0b0000_0011)?,
            no_local: byte & 0b0000_0100 != 0,
            retain_as_published: byte & 0b0000_1000 != 0,
            retain_handling,
        })
    }

    const fn encode(self) -> u8 {
        (self.qos as u8)
            | ((self.no_local as u8) << 2)
            | ((self.retain_as_published as u8) << 3)
            | (self.retain_handling << 4)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeTopic {
    topic_filter: StringData,
    options: SubscribeOptions,
}

impl SubscribeTopic {
    pub fn new(topic_filter: &str, options: SubscribeOptions) -> Result<Self, EncodeError> {
        Ok(Self {
            topic_filter: StringData::from(topic_filter)?,
            options,
        })
    }

    #[must_use]
    pub fn topic_filter(&self) -> &str {
        self.topic_filter.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> SubscribeOptions {
        self.options
    }

    fn bytes(&self) -> usize {
        self.topic_filter.bytes() + 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribePacket {
    packet_id: PacketId,
    properties: Properties,
    topics: Vec<SubscribeTopic>,
}

impl SubscribePacket {
    #[must_use]
    pub fn new(packet_id: PacketId, topics: Vec<SubscribeTopic>) -> Self {
        Self {
            packet_id,
            properties: Properties::new(),
            topics,
        }
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    #[must_use]
    pub fn topics(&self) -> &[SubscribeTopic] {
        &self.topics
    }

    fn remaining_length(&self) -> usize {
        2 + self.properties.encoded_len()
            + self.topics.iter().map(SubscribeTopic::bytes).sum::<usize>()
    }
}

impl PacketTrait for SubscribePacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Subscribe
    }
}

impl DecodePacket for SubscribePacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Subscribe {
            return Err(DecodeError::InvalidPacketType);
        }
        let packet_id = PacketId::decode(ba)?;
        let start_offset = ba.offset();
        let properties = Properties::decode_allowed(ba, SUBSCRIBE_PROPERTIES)?;
        let consumed_before_topics = 2 + (ba.offset() - start_offset);

        let mut consumed = consumed_before_topics;
        let mut topics = Vec::new();
        while consumed < fixed_header.remaining_length() {
            let topic_filter = StringData::decode(ba)?;
            let options = SubscribeOptions::decode(ba.read_byte()?)?;
            consumed += topic_filter.bytes() + 1;
            topics.push(SubscribeTopic {
                topic_filter,
                options,
            });
        }
        if topics.is_empty() {
            return Err(DecodeError::EmptyTopicFilter);
        }
        Ok(Self {
            packet_id,
            properties,
            topics,
        })
    }
}

impl EncodePacket for SubscribePacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header =
            FixedHeader::with_flags(PacketType::Subscribe, 0b0010, self.remaining_length())?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        self.properties.encode(buf)?;
        for topic in &self.topics {
            topic.topic_filter.encode(buf)?;
            buf.push(topic.options.encode());
        }
        Ok(buf.len() - start)
    }
}

impl SubscribePacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Subscribe, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let packet = SubscribePacket::new(
            5,
            vec![SubscribeTopic::new("a/+", SubscribeOptions::new(QoS::AtMostOnce)).unwrap()],
        );
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(SubscribePacket::decode(&mut ba).unwrap(), packet);
    }
}
