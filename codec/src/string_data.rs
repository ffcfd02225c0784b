use std::fmt;

use crate::{ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket};

/// Length-prefixed UTF-8 string as used throughout the MQTT wire format:
/// a two-byte big-endian length followed by that many bytes of UTF-8 text.
///
/// The MQTT spec disallows embedded `U+0000` and ill-formed UTF-8
/// [MQTT-1.5.4-1][MQTT-1.5.4-2]; both are rejected at construction/decode time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringData(String);

impl StringData {
    #[must_use]
    pub const fn new() -> Self {
        Self(String::new())
    }

    pub fn from(s: &str) -> Result<Self, EncodeError> {
        validate(s).map_err(|()| EncodeError::TooManyData)?;
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn bytes(&self) -> usize {
        2 + self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate(s: &str) -> Result<(), ()> {
    if s.len() > u16::MAX as usize || s.contains('\u{0}') {
        return Err(());
    }
    Ok(())
}

impl fmt::Display for StringData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for StringData {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<StringData> for String {
    fn from(s: StringData) -> String {
        s.0
    }
}

impl DecodePacket for StringData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let len = ba.read_u16()?;
        let s = ba.read_string(len as usize)?;
        if s.contains('\u{0}') {
            return Err(DecodeError::InvalidUtf8);
        }
        Ok(Self(s))
    }
}

impl EncodePacket for StringData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let len: u16 = self
            .0
            .len()
            .try_into()
            .map_err(|_| EncodeError::TooManyData)?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(self.0.as_bytes());
        Ok(self.bytes())
    }
}
