use std::fmt;
use std::string::FromUtf8Error;

/// Error produced while parsing bytes received off the wire into a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer ran out before the expected field could be read.
    OutOfRange,

    /// The protocol name in a CONNECT packet was not `"MQTT"`.
    InvalidProtocolName,

    /// Protocol level is not `4` (3.1.1) or `5` (5.0).
    InvalidProtocolLevel,

    /// Fixed-header packet type nibble does not map to a known packet type,
    /// or its reserved flag bits are non-zero for a type that requires them to be.
    InvalidPacketType,

    /// Fixed-header flag bits are invalid for this packet type.
    InvalidPacketFlags,

    /// QoS nibble is `3` (reserved).
    InvalidQoS,

    /// Client id is empty, too long, or contains characters the server refuses.
    InvalidClientId,

    /// Remaining-length value does not match the bytes actually available, or
    /// exceeds the 4-byte / 268,435,455 wire limit.
    InvalidRemainingLength,

    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8,

    /// A boolean wire byte was neither `0x00` nor `0x01`.
    InvalidBoolData,

    /// A SUBSCRIBE packet's payload held zero topic filters.
    EmptyTopicFilter,

    /// A v5 property with an unrecognized id was received.
    InvalidPropertyId,

    /// A property that must appear at most once appeared twice.
    DuplicateProperty,

    /// A property does not belong in the property section of this packet type.
    PropertyNotAllowed,

    /// Declared remaining length (or a derived payload length) exceeds what this
    /// library is willing to buffer.
    PayloadTooLarge,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::OutOfRange => "buffer exhausted before expected field",
            Self::InvalidProtocolName => "invalid protocol name",
            Self::InvalidProtocolLevel => "invalid protocol level",
            Self::InvalidPacketType => "invalid packet type",
            Self::InvalidPacketFlags => "invalid packet flags",
            Self::InvalidQoS => "invalid QoS value",
            Self::InvalidClientId => "invalid client id",
            Self::InvalidRemainingLength => "invalid remaining length",
            Self::InvalidUtf8 => "invalid UTF-8 string",
            Self::InvalidBoolData => "invalid boolean wire value",
            Self::EmptyTopicFilter => "SUBSCRIBE packet has no topic filters",
            Self::InvalidPropertyId => "unknown v5 property id",
            Self::DuplicateProperty => "duplicate v5 property",
            Self::PropertyNotAllowed => "property not allowed for this packet type",
            Self::PayloadTooLarge => "payload exceeds maximum accepted size",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for DecodeError {}

impl From<FromUtf8Error> for DecodeError {
    fn from(_: FromUtf8Error) -> Self {
        Self::InvalidUtf8
    }
}

/// Error produced while serializing a packet to bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// A length-prefixed field (string, binary data, remaining length) would
    /// overflow its wire representation.
    TooManyData,

    /// Client id failed the server's validation rules.
    InvalidClientId,

    /// Topic name or filter failed validation (empty, contains `\0`, too long).
    InvalidTopic,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::TooManyData => "field exceeds maximum encodable length",
            Self::InvalidClientId => "invalid client id",
            Self::InvalidTopic => "invalid topic name or filter",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for EncodeError {}

impl From<crate::var_int::VarIntError> for EncodeError {
    fn from(_: crate::var_int::VarIntError) -> Self {
        Self::TooManyData
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(_: std::io::Error) -> Self {
        Self::TooManyData
    }
}
