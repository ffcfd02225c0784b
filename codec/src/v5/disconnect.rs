use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketTrait,
    PacketType, VarIntError,
};

const DISCONNECT_PROPERTIES: &[PropertyId] = &[
    PropertyId::SessionExpiryInterval,
    PropertyId::ReasonString,
    PropertyId::UserProperty,
    PropertyId::ServerReference,
];

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisconnectReasonCode {
    #[default]
    NormalDisconnection = 0x00,
    DisconnectWithWillMessage = 0x04,
    UnspecifiedError = 0x80,
    ProtocolError = 0x82,
    SessionTakenOver = 0x8e,
    KeepAliveTimeout = 0x8d,
}

impl From<u8> for DisconnectReasonCode {
    fn from(v: u8) -> Self {
        match v {
            0x00 => Self::NormalDisconnection,
            0x04 => Self::DisconnectWithWillMessage,
            0x82 => Self::ProtocolError,
            0x8d => Self::KeepAliveTimeout,
            0x8e => Self::SessionTakenOver,
            _ => Self::UnspecifiedError,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisconnectPacket {
    reason_code: DisconnectReasonCode,
    properties: Properties,
}

impl DisconnectPacket {
    #[must_use]
    pub fn new(reason_code: DisconnectReasonCode) -> Self {
        Self {
            reason_code,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub const fn reason_code(&self) -> DisconnectReasonCode {
        self.reason_code
    }

    fn remaining_length(&self) -> usize {
        if self.reason_code == DisconnectReasonCode::NormalDisconnection
            && self.properties.iter().next().is_none()
        {
            0
        } else {
            1 + self.properties.encoded_len()
        }
    }
}

impl PacketTrait for DisconnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Disconnect
    }
}

impl DecodePacket for DisconnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Disconnect {
            return Err(DecodeError::InvalidPacketType);
        }
        if fixed_header.remaining_length() == 0 {
            return Ok(Self::default());
        }
        let reason_code = DisconnectReasonCode::from(ba.read_byte()?);
        let properties = if fixed_header.remaining_length() > 1 {
            Properties::decode_allowed(ba, DISCONNECT_PROPERTIES)?
        } else {
            Properties::new()
        };
        Ok(Self {
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for DisconnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::Disconnect, self.remaining_length())?;
        fixed_header.encode(buf)?;
        if self.remaining_length() > 0 {
            buf.push(self.reason_code as u8);
            if self.remaining_length() > 1 {
                self.properties.encode(buf)?;
            }
        }
        Ok(buf.len() - start)
    }
}

impl DisconnectPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Disconnect, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}
