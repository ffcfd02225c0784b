use crate::v5::property::{Properties, PropertyId};
use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketId,
    PacketTrait, PacketType, VarIntError,
};

const ACK_PROPERTIES: &[PropertyId] = &[PropertyId::ReasonString, PropertyId::UserProperty];

macro_rules! reason_ack_packet {
    ($name:ident, $packet_type:expr, $flags:expr) => {
        /// Wire-complete representation of this acknowledgement type; this
        /// crate's broker/client never originate it since QoS 1/2 flows are
        /// out of scope, but a v5 stream containing one still decodes.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            packet_id: PacketId,
            reason_code: u8,
            properties: Properties,
        }

        impl $name {
            #[must_use]
            pub fn new(packet_id: PacketId, reason_code: u8) -> Self {
                Self {
                    packet_id,
                    reason_code,
                    properties: Properties::new(),
                }
            }

            #[must_use]
            pub const fn packet_id(&self) -> PacketId {
                self.packet_id
            }

            #[must_use]
            pub const fn reason_code(&self) -> u8 {
                self.reason_code
            }

            fn remaining_length(&self) -> usize {
                // Packet id + reason code; properties + their own length
                // prefix are omitted entirely when reason is plain success
                // and there are no properties, per [MQTT-3.4.2.2.1] family.
                if self.reason_code == 0 && self.properties.iter().next().is_none() {
                    2
                } else {
                    3 + self.properties.encoded_len()
                }
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
                let packet_id = PacketId::decode(ba)?;
                if fixed_header.remaining_length() == 2 {
                    return Ok(Self {
                        packet_id,
                        reason_code: 0,
                        properties: Properties::new(),
                    });
                }
                let reason_code = ba.read_byte()?;
                let properties = Properties::decode_allowed(ba, ACK_PROPERTIES)?;
                Ok(Self {
                    packet_id,
                    reason_code,
                    properties,
                })
            }
        }

        impl EncodePacket for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
                let start = buf.len();
                let fixed_header =
                    FixedHeader::with_flags($packet_type, $flags, self.remaining_length())?;
                fixed_header.encode(buf)?;
                self.packet_id.encode(buf)?;
                if self.remaining_length() > 2 {
                    buf.push(self.reason_code);
                    self.properties.encode(buf)?;
                }
                Ok(buf.len() - start)
            }
        }

        impl $name {
            pub fn bytes(&self) -> Result<usize, VarIntError> {
                let fixed_header =
                    FixedHeader::with_flags($packet_type, $flags, self.remaining_length())?;
                Ok(fixed_header.bytes() + self.remaining_length())
            }
        }
    };
}

reason_ack_packet!(PublishAckPacket, PacketType::PublishAck, 0);
reason_ack_packet!(PublishReceivedPacket, PacketType::PublishReceived, 0);
reason_ack_packet!(PublishReleasePacket, PacketType::PublishRelease, 0b0010);
reason_ack_packet!(PublishCompletePacket, PacketType::PublishComplete, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_no_properties_is_compact() {
        let packet = PublishAckPacket::new(1, 0);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PublishAckPacket::decode(&mut ba).unwrap(), packet);
    }

    #[test]
    fn non_success_carries_reason_and_properties() {
        let packet = PublishAckPacket::new(1, 0x80);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PublishAckPacket::decode(&mut ba).unwrap(), packet);
    }
}
