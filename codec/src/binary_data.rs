use crate::{ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket};

/// Length-prefixed opaque byte string (will payload, v5 correlation data, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryData(Vec<u8>);

impl BinaryData {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, EncodeError> {
        if data.len() > u16::MAX as usize {
            return Err(EncodeError::TooManyData);
        }
        Ok(Self(data.to_vec()))
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

impl AsRef<[u8]> for BinaryData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl DecodePacket for BinaryData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let len = ba.read_u16()?;
        let data = ba.read_bytes(len as usize)?;
        Ok(Self(data.to_vec()))
    }
}

impl EncodePacket for BinaryData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let len: u16 = self
            .0
            .len()
            .try_into()
            .map_err(|_| EncodeError::TooManyData)?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.0);
        Ok(self.bytes())
    }
}
