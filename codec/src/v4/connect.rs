use crate::{
    BinaryData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader,
    PacketTrait, PacketType, QoS, StringData, VarIntError,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ConnectFlags {
    has_username: bool,
    has_password: bool,
    will_retain: bool,
    will_qos: QoS,
    will: bool,
    clean_session: bool,
}

impl ConnectFlags {
    fn decode(byte: u8) -> Result<Self, DecodeError> {
        if byte & 0b0000_0001 != 0 {
            // Reserved bit [MQTT-3.1.2-3].
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
            clean_session: byte & 0b0000_0010 != 0,
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
        if self.clean_session {
            byte |= 0b0000_0010;
        }
        byte
    }
}

/// CONNECT packet: the first packet a client sends on a new connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectPacket {
    client_id: StringData,
    clean_session: bool,
    keep_alive: u16,
    will_topic: Option<StringData>,
    will_message: BinaryData,
    will_qos: QoS,
    will_retain: bool,
    username: Option<StringData>,
    password: Option<BinaryData>,
}

impl ConnectPacket {
    pub fn new(client_id: &str) -> Result<Self, EncodeError> {
        Ok(Self {
            client_id: StringData::from(client_id)?,
            clean_session: true,
            keep_alive: 60,
            will_topic: None,
            will_message: BinaryData::new(),
            will_qos: QoS::AtMostOnce,
            will_retain: false,
            username: None,
            password: None,
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_ref()
    }

    #[must_use]
    pub const fn clean_session(&self) -> bool {
        self.clean_session
    }

    pub fn set_clean_session(&mut self, clean_session: bool) -> &mut Self {
        self.clean_session = clean_session;
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

    #[must_use]
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_ref().map(AsRef::as_ref)
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

    #[must_use]
    pub fn will(&self) -> Option<(&str, &[u8], QoS, bool)> {
        self.will_topic.as_ref().map(|topic| {
            (
                topic.as_ref(),
                self.will_message.as_ref(),
                self.will_qos,
                self.will_retain,
            )
        })
    }

    fn flags(&self) -> ConnectFlags {
        ConnectFlags {
            has_username: self.username.is_some(),
            has_password: self.password.is_some(),
            will_retain: self.will_retain,
            will_qos: self.will_qos,
            will: self.will_topic.is_some(),
            clean_session: self.clean_session,
        }
    }

    fn variable_and_payload_bytes(&self) -> usize {
        // "MQTT" string (2+4) + level (1) + flags (1) + keep-alive (2)
        let mut len = 2 + 4 + 1 + 1 + 2;
        len += self.client_id.bytes();
        if let Some(topic) = &self.will_topic {
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
        if level != 4 {
            return Err(DecodeError::InvalidProtocolLevel);
        }

        let flags = ConnectFlags::decode(ba.read_byte()?)?;
        let keep_alive = ba.read_u16()?;
        let client_id = StringData::decode(ba)?;

        let (will_topic, will_message) = if flags.will {
            (Some(StringData::decode(ba)?), BinaryData::decode(ba)?)
        } else {
            (None, BinaryData::new())
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
            clean_session: flags.clean_session,
            keep_alive,
            will_topic,
            will_message,
            will_qos: flags.will_qos,
            will_retain: flags.will_retain,
            username,
            password,
        })
    }
}

impl EncodePacket for ConnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::Connect, self.variable_and_payload_bytes())?;
        fixed_header.encode(buf)?;

        StringData::from("MQTT")?.encode(buf)?;
        buf.push(4);
        buf.push(self.flags().encode());
        buf.extend_from_slice(&self.keep_alive.to_be_bytes());
        self.client_id.encode(buf)?;

        if let Some(topic) = &self.will_topic {
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
        let fixed_header = FixedHeader::new(PacketType::Connect, self.variable_and_payload_bytes())?;
        Ok(fixed_header.bytes() + self.variable_and_payload_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_minimal() {
        let packet = ConnectPacket::new("client-01").unwrap();
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn roundtrip_with_will_and_credentials() {
        let mut packet = ConnectPacket::new("client-02").unwrap();
        packet
            .set_will("status/client-02", b"offline", QoS::AtMostOnce, true)
            .unwrap();
        packet.set_username("alice").unwrap();
        packet.set_password(b"hunter2").unwrap();
        packet.set_clean_session(false);
        packet.set_keep_alive(30);

        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded.keep_alive(), 30);
        assert!(!decoded.clean_session());
    }

    #[test]
    fn rejects_wrong_protocol_name() {
        let buf = vec![
            0x10, 0x09, 0x00, 0x03, b'M', b'Q', b'X', 0x04, 0x02, 0x00, 0x00,
        ];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(ConnectPacket::decode(&mut ba), Err(DecodeError::InvalidProtocolName));
    }
}
