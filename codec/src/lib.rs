//! Wire codec for MQTT 3.1.1 (v4) and MQTT 5.0 (v5).
//!
//! This crate only knows how to turn bytes into packets and back; it has no
//! notion of a socket, a session, or a subscription. See `transport`, `mux`,
//! `broker` and `client` for the rest of the stack.

mod base;
mod binary_data;
mod bool_data;
mod byte_array;
mod error;
mod packet;
mod string_data;
mod string_pair_data;
mod topic;
mod u32_data;
mod utils;
mod var_int;

pub mod v4;
pub mod v5;

pub use base::{
    packet_id_bytes, DecodePacket, EncodePacket, FixedHeader, Packet as PacketTrait, PacketId,
    PacketType, ProtocolVersion, QoS,
};
pub use binary_data::BinaryData;
pub use bool_data::BoolData;
pub use byte_array::ByteArray;
pub use error::{DecodeError, EncodeError};
pub use packet::Packet;
pub use string_data::StringData;
pub use string_pair_data::StringPairData;
pub use topic::{TopicFilter, TopicName};
pub use u32_data::U32Data;
pub use utils::{random_string, validate_client_id, ClientIdError};
pub use var_int::{VarInt, VarIntError, MAX_VAR_INT};

/// A full MQTT control packet read from, or to be written to, the wire.
/// Reads the fixed header, dispatches on `(packet_type, protocol_version)`
/// and returns the fully decoded variant.
pub fn read_packet(buf: &[u8], protocol_version: ProtocolVersion) -> Result<Packet, DecodeError> {
    packet::read_packet(buf, protocol_version)
}

/// Encode `packet` to `buf`, returning the number of bytes appended.
pub fn write_packet(packet: &Packet, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
    packet::write_packet(packet, buf)
}

/// Inspect a freshly received CONNECT packet's declared protocol level
/// without fully decoding it as either a v4 or v5 packet.
pub fn peek_protocol_version(buf: &[u8]) -> Result<ProtocolVersion, DecodeError> {
    packet::peek_protocol_version(buf)
}
