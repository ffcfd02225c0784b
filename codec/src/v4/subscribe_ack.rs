use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, VarIntError,
};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeAckReason {
    SuccessMaxQoS0 = 0x00,
    SuccessMaxQoS1 = 0x01,
    SuccessMaxQoS2 = 0x02,
    Failure = 0x80,
}

impl TryFrom<u8> for SubscribeAckReason {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x00 => Ok(Self::SuccessMaxQoS0),
            0x01 => Ok(Self::SuccessMaxQoS1),
            0x02 => Ok(Self::SuccessMaxQoS2),
            0x80 => Ok(Self::Failure),
            _ => Err(DecodeError::InvalidQoS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeAckPacket {
    packet_id: PacketId,
    reasons: Vec<SubscribeAckReason>,
}

impl SubscribeAckPacket {
    #[must_use]
    pub fn new(packet_id: PacketId, reasons: Vec<SubscribeAckReason>) -> Self {
        Self { packet_id, reasons }
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    #[must_use]
    pub fn reasons(&self) -> &[SubscribeAckReason] {
        &self.reasons
    }
}

impl PacketTrait for SubscribeAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::SubscribeAck
    }
}

impl DecodePacket for SubscribeAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::SubscribeAck {
            return Err(DecodeError::InvalidPacketType);
        }
        let packet_id = PacketId::decode(ba)?;
        let reason_count = fixed_header
            .remaining_length()
            .checked_sub(2)
            .ok_or(DecodeError::InvalidRemainingLength)?;
        let mut reasons = Vec::with_capacity(reason_count);
        for _ in 0..reason_count {
            reasons.push(SubscribeAckReason::try_from(ba.read_byte()?)?);
        }
        Ok(Self { packet_id, reasons })
    }
}

impl EncodePacket for SubscribeAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let start = buf.len();
        let fixed_header = FixedHeader::new(PacketType::SubscribeAck, 2 + self.reasons.len())?;
        fixed_header.encode(buf)?;
        self.packet_id.encode(buf)?;
        for reason in &self.reasons {
            buf.push(*reason as u8);
        }
        Ok(buf.len() - start)
    }
}

impl SubscribeAckPacket {
    pub fn bytes(&self) -> Result<usize, VarIntError> {
        let remaining = 2 + self.reasons.len();
        let fixed_header = FixedHeader::new(PacketType::SubscribeAck, remaining)?;
        Ok(fixed_header.bytes() + remaining)
    }
}
