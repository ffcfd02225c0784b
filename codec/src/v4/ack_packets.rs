use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, VarIntError,
};

macro_rules! packet_id_only_packet {
    ($name:ident, $packet_type:expr, $flags:expr) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            packet_id: PacketId,
        }

        impl $name {
            #[must_use]
            pub const fn new(packet_id: PacketId) -> Self {
                Self { packet_id }
            }

            #[must_use]
            pub const fn packet_id(&self) -> PacketId {
                self.packet_id
            }

            pub fn bytes(&self) -> Result<usize, VarIntError> {
                let fixed_header = FixedHeader::with_flags($packet_type, $flags, 2)?;
                Ok(fixed_header.bytes() + 2)
            }
        }

        impl PacketTrait for $name {
            fn packet_type(&self) -> PacketType {
                $packet_type
            }
        }

        impl DecodePacket for $name {
            fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
                let fixed_header = FixedHeader::decode(ba)?;
                if fixed_header.packet_type() != $packet_type {
                    return Err(DecodeError::InvalidPacketType);
                }
                if fixed_header.remaining_length() != 2 {
                    return Err(DecodeError::InvalidRemainingLength);
                }
                let packet_id = PacketId::decode(ba)?;
                Ok(Self { packet_id })
            }
        }

        impl EncodePacket for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
                let start = buf.len();
                let fixed_header = FixedHeader::with_flags($packet_type, $flags, 2)?;
                fixed_header.encode(buf)?;
                self.packet_id.encode(buf)?;
                Ok(buf.len() - start)
            }
        }
    };
}

packet_id_only_packet!(PublishAckPacket, PacketType::PublishAck, 0);
packet_id_only_packet!(PublishReceivedPacket, PacketType::PublishReceived, 0);
packet_id_only_packet!(PublishReleasePacket, PacketType::PublishRelease, 0b0010);
packet_id_only_packet!(PublishCompletePacket, PacketType::PublishComplete, 0);
packet_id_only_packet!(UnsubscribeAckPacket, PacketType::UnsubscribeAck, 0);
