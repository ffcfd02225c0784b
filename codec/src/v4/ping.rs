use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, PacketTrait,
    PacketType, VarIntError,
};

macro_rules! empty_packet {
    ($name:ident, $packet_type:expr) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name;

        impl $name {
            #[must_use]
            pub const fn new() -> Self {
                Self
            }

            pub fn bytes(&self) -> Result<usize, VarIntError> {
                Ok(FixedHeader::new($packet_type, 0)?.bytes())
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
                if fixed_header.remaining_length() != 0 {
                    return Err(DecodeError::InvalidRemainingLength);
                }
                Ok(Self)
            }
        }

        impl EncodePacket for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
                FixedHeader::new($packet_type, 0)?.encode(buf)
            }
        }
    };
}

empty_packet!(PingRequestPacket, PacketType::PingRequest);
empty_packet!(PingResponsePacket, PacketType::PingResponse);
empty_packet!(DisconnectPacket, PacketType::Disconnect);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_roundtrip() {
        let mut buf = Vec::new();
        PingRequestPacket::new().encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0xc0, 0x00]);
        let mut ba = ByteArray::new(&buf);
        assert_eq!(PingRequestPacket::decode(&mut ba).unwrap(), PingRequestPacket::new());
    }

    #[test]
    fn disconnect_roundtrip() {
        let mut buf = Vec::new();
        DisconnectPacket::new().encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0xe0, 0x00]);
    }
}
