use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketTrait,
    PacketType, VarIntError,
};

const AUTH_PROPERTIES: &[PropertyId] = &[
    PropertyId::AuthenticationMethod,
    PropertyId::AuthenticationData,
    PropertyId::ReasonString,
    PropertyId::UserProperty,
];

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthReasonCode {
    #[default]
    Success = 0x00,
    ContinueAuthentication = 0x18,
    ReAuthenticate = 0x19,
}

impl From<u8> for AuthReasonCode {
    fn from(v: u8) -> Self {
        match v {
            0x18 => Self::ContinueAuthentication,
            0x19 => Self::ReAuthenticate,
            _ => Self::Success,
        }
    }
}

/// AUTH packet, used for the v5 enhanced authentication exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthPacket {
    reason_code: AuthReasonCode,
    properties: Properties,
}

impl AuthPacket {
    #[must_use]
    pub fn new(reason_code: AuthReasonCode) -> Self {
        Self {
            reason_code,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub const fn reason_code(&self) -> AuthReasonCode {
        self.reason_code
    }

    fn remaining_length(&self) -> usize {
        if self.reason_code == AuthReasonCode::Success && self.properties.iter().next().is_none() {
            0
        } else {
            1 + self.properties.encoded_len()
        }
    }
}

impl PacketTrait for AuthPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Auth
    }
}

impl DecodePacket for AuthPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Auth {
            return Err(DecodeError::InvalidPacketType);
        }
        if fixed_header.remaining_length() == 0 {
            return Ok(Self::default());
        }
        let reason_code = AuthReasonCode::from(ba.read_byte()?);
        let properties = Properties::decode_allowed(ba, AUTH_PROPERTIES)?;
        Ok(Self {
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for AuthPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::Auth, self.remaining_length())?;
        fixed_header.encode(buf)?;
        if self.remaining_length() > 0 {
            buf.push(self.reason_code as u8);
            self.properties.encode(buf)?;
        }
        Ok(buf.len() - start)
    }
}

impl AuthPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let fixed_header = FixedHeader::new(PacketType::Auth, self.remaining_length())?;
        Ok(fixed_header.bytes() + self.remaining_length())
    }
}
