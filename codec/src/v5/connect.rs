use crate::v5::property::{Properties, Property, PropertyId};
use crate::{
    BinaryData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader,
    PacketTrait, PacketType, QoS, StringData, VarIntError,
};

const CONNECT_PROPERTIES: &[PropertyId] = &[
    PropertyId::SessionExpiryInterval,
    PropertyId::ReceiveMaximum,
    PropertyId::MaximumPacketSize,
    PropertyId::TopicAliasMaximum,
    PropertyId::RequestResponseInformation,
    PropertyId::RequestProblemInformation,
    PropertyId::UserProperty,
    PropertyId::AuthenticationMethod,
    PropertyId::AuthenticationData,
];

const WILL_PROPERTIES: &[PropertyId] = &[
    PropertyId::WillDelayInterval,
    PropertyId::PayloadFormatIndicator,
    PropertyId::MessageExpiryInterval,
    PropertyId::ContentType,
    PropertyId::ResponseTopic,
    PropertyId::CorrelationData,
    PropertyId::UserProperty,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ConnectFlags {
    has_username: bool,
    has_password: bool,
    will_retain: bool,
    will_qos: QoS,
    will: bool,
    clean_start: bool,
}

impl ConnectFlags {
    fn decode(byte: u8) -> Result<Self, DecodeError> {
        if byte & 0b0000_0001 != 0 {
            return Err(DecodeError::InvalidPacketFlags);
        }
        let will = byte & 0b0000_0100 != 0;
        let will_qos = QoS::try_from((byte & 0b0001_1000) >> 3)?;
        if !will && will_qos != QoS::AtMostOnce {
            return Err(DecodeError::InvalidPacketFlags);
        }
        Ok(Self {
            has_username: byte & 0b1000_0000 != 0,
            has_password: byte & 0b0100_0000 != 0,
            will_retain: byte & 0b0010_0000 != 0,
            will_qos,
            will,
            clean_start: byte & 0b0000_0010 != 0,
        })
    }

    const fn encode(self) -> u8 {
        let mut byte = 0u8;
        if self.has_username {
            byte |= 0b1000_0000;
        }
        if self.has_password {
            byte |= 0b0100_0000;
        }
        if self.will_retain {
            byte |= 0b0010_0000;
        }
        byte |= (self.will_qos as u8) << 3;
        if self.will {
            byte |= 0b0000_0100;
        }
        if self.clean_start {
            byte |= 0b0000_0010;
        }
        byte
    }
}

/// v5 CONNECT packet. Field access mirrors `v4::ConnectPacket`; the
/// additional `properties` carries the v5-only connection parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectPacket {
    client_id: StringData,
    clean_start: bool,
    keep_alive: u16,
    properties: Properties,
    will_topic: Option<StringData>,
    will_message: BinaryData,
    will_qos: QoS,
    will_retain: bool,
    will_properties: Properties,
    username: Option<StringData>,
    password: Option<BinaryData>,
}

impl ConnectPacket {
    pub fn new(client_id: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            client_id: StringData::from(client_id)?,
            clean_start: true,
            keep_alive: 60,
            properties: Properties::new(),
            will_topic: None,
            will_message: BinaryData::new(),
            will_qos: QoS::AtMostOnce,
            will_retain: false,
            will_properties: Properties::new(),
            username: None,
            password: None,
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_ref()
    }

    #[must_use]
    pub const fn clean_start(&self) -> bool {
        self.clean_start
    }

    pub fn set_clean_start(&mut self, clean_start: bool) -> &mut Self {
        self.clean_start = clean_start;
        self
    }

    #[must_use]
    pub const fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn set_keep_alive(&mut self, keep_alive: u16) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn add_property(&mut self, property: Property) -> &mut Self {
        self.properties.push(property);
        self
    }

    pub fn set_username(&mut self, username: &str) -> Result<&mut Self, EncodeError> {
        self.username = Some(StringData::from(username)?);
        Ok(self)
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_ref().map(AsRef::as_ref)
    }

    pub fn set_password(&mut self, password: &[u8]) -> Result<&mut Self, EncodeError> {
        self.password = Some(BinaryData::from_slice(password)?);
        Ok(self)
    }

    pub fn set_will(
        &mut self,
        topic: &str,
        message: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<&mut Self, EncodeError> {
        self.will_topic = Some(StringData::from(topic)?);
        self.will_message = BinaryData::from_slice(message)?;
        self.will_qos = qos;
        self.will_retain = retain;
        Ok(self)
    }

    fn flags(&self) -> ConnectFlags {
        ConnectFlags {
            has_username: self.username.is_some(),
            has_password: self.password.is_some(),
            will_retain: self.will_retain,
            will_qos: self.will_qos,
            will: self.will_topic.is_some(),
            clean_start: self.clean_start,
        }
    }

    fn remaining_length(&self) -> usize {
        let mut len = 2 + 4 + 1 + 1 + 2;
        len += self.properties.encoded_len();
        len += self.client_id.bytes();
        if let Some(topic) = &self.will_topic {
            len += self.will_properties.encoded_len();
            len += topic.bytes() + self.will_message.bytes();
        }
        if let Some(username) = &self.username {
            len += username.bytes();
        }
        if let Some(password) = &self.password {
            len += password.bytes();
        }
        len
    }
}

impl PacketTrait for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }
}

impl DecodePacket for ConnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Connect {
            return Err(DecodeError::InvalidPacketType);
        }

        let protocol_name = StringData::decode(ba)?;
        if protocol_name.as_ref() != "MQTT" {
            return Err(DecodeError::InvalidProtocolName);
        }
        let level = ba.read_byte()?;
        if level != 5 {
            return Err(DecodeError::InvalidProtocolLevel);
        }

        let flags = ConnectFlags::decode(ba.read_byte()?)?;
        let keep_alive = ba.read_u16()?;
        let properties = Properties::decode_allowed(ba, CONNECT_PROPERTIES)?;
        let client_id = StringData::decode(ba)?;

        let (will_topic, will_message, will_properties) = if flags.will {
            let will_properties = Properties::decode_allowed(ba, WILL_PROPERTIES)?;
            (
                Some(StringData::decode(ba)?),
                BinaryData::decode(ba)?,
                will_properties,
            )
        } else {
            (None, BinaryData::new(), Properties::new())
        };

        let username = if flags.has_username {
            Some(StringData::decode(ba)?)
        } else {
            None
        };
        let password = if flags.has_password {
            Some(BinaryData::decode(ba)?)
        } else {
            None
        };

        Ok(Self {
            client_id,
            clean_start: flags.clean_start,
            keep_alive,
            properties,
            will_topic,
            will_message,
            will_qos: flags.will_qos,
            will_retain: flags.will_retain,
            will_properties,
            username,
            password,
        })
    }
}

impl EncodePacket for ConnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::Connect, self.remaining_length())?;
        fixed_header.encode(buf)?;

        StringData::from("MQTT")?.encode(buf)?;
        buf.push(5);
        buf.push(self.flags().encode());
        buf.extend_from_slice(&self.keep_alive.to_be_bytes());
        self.properties.encode(buf)?;
        self.client_id.encode(buf)?;

        if let Some(topic) = &self.will_topic {
            self.will_properties.encode(buf)?;
            topic.encode(buf)?;
            self.will_message.encode(buf)?;
        }
        if let Some(username) = &self.username {
            username.encode(buf)?;
        }
        if let Some(password) = &self.password {
            password.encode(buf)?;
        }

        Ok(buf.len() - start)
    }
}

impl ConnectPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Connect, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_properties() {
        let mut packet = ConnectPacket::new("client-v5").unwrap();
        packet.add_property(Property::SessionExpiryInterval(120));
        packet.add_property(Property::ReceiveMaximum(20));
        packet.set_username("bob").unwrap();

        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }
}
