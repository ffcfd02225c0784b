use crate::{
    BinaryData, BoolData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket,
    StringData, StringPairData, U32Data, VarInt,
};

/// v5 property identifiers this crate understands. Values match the MQTT 5.0
/// spec's assigned ids so an unrecognized id decodes as `InvalidPropertyId`
/// rather than silently accepted.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyId {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0b,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1a,
    ServerReference = 0x1c,
    ReasonString = 0x1f,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2a,
}

impl TryFrom<usize> for PropertyId {
    type Error = DecodeError;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        Ok(match v {
            0x01 => Self::PayloadFormatIndicator,
            0x02 => Self::MessageExpiryInterval,
            0x03 => Self::ContentType,
            0x08 => Self::ResponseTopic,
            0x09 => Self::CorrelationData,
            0x0b => Self::SubscriptionIdentifier,
            0x11 => Self::SessionExpiryInterval,
            0x12 => Self::AssignedClientIdentifier,
            0x13 => Self::ServerKeepAlive,
            0x15 => Self::AuthenticationMethod,
            0x16 => Self::AuthenticationData,
            0x17 => Self::RequestProblemInformation,
            0x18 => Self::WillDelayInterval,
            0x19 => Self::RequestResponseInformation,
            0x1a => Self::ResponseInformation,
            0x1c => Self::ServerReference,
            0x1f => Self::ReasonString,
            0x21 => Self::ReceiveMaximum,
            0x22 => Self::TopicAliasMaximum,
            0x23 => Self::TopicAlias,
            0x24 => Self::MaximumQoS,
            0x25 => Self::RetainAvailable,
            0x26 => Self::UserProperty,
            0x27 => Self::MaximumPacketSize,
            0x28 => Self::WildcardSubscriptionAvailable,
            0x29 => Self::SubscriptionIdentifierAvailable,
            0x2a => Self::SharedSubscriptionAvailable,
            _ => return Err(DecodeError::InvalidPropertyId),
        })
    }
}

/// Properties allowed to appear more than once in a single property section.
const MULTIPLE_ALLOWED: &[PropertyId] = &[PropertyId::UserProperty, PropertyId::SubscriptionIdentifier];

/// One decoded (id, value) property entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    PayloadFormatIndicator(u8),
    MessageExpiryInterval(u32),
    ContentType(String),
    ResponseTopic(String),
    CorrelationData(Vec<u8>),
    SubscriptionIdentifier(usize),
    SessionExpiryInterval(u32),
    AssignedClientIdentifier(String),
    ServerKeepAlive(u16),
    AuthenticationMethod(String),
    AuthenticationData(Vec<u8>),
    RequestProblemInformation(bool),
    WillDelayInterval(u32),
    RequestResponseInformation(bool),
    ResponseInformation(String),
    ServerReference(String),
    ReasonString(String),
    ReceiveMaximum(u16),
    TopicAliasMaximum(u16),
    TopicAlias(u16),
    MaximumQoS(u8),
    RetainAvailable(bool),
    UserProperty(String, String),
    MaximumPacketSize(u32),
    WildcardSubscriptionAvailable(bool),
    SubscriptionIdentifierAvailable(bool),
    SharedSubscriptionAvailable(bool),
}

impl Property {
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        match self {
            Self::PayloadFormatIndicator(_) => PropertyId::PayloadFormatIndicator,
            Self::MessageExpiryInterval(_) => PropertyId::MessageExpiryInterval,
            Self::ContentType(_) => PropertyId::ContentType,
            Self::ResponseTopic(_) => PropertyId::ResponseTopic,
            Self::CorrelationData(_) => PropertyId::CorrelationData,
            Self::SubscriptionIdentifier(_) => PropertyId::SubscriptionIdentifier,
            Self::SessionExpiryInterval(_) => PropertyId::SessionExpiryInterval,
            Self::AssignedClientIdentifier(_) => PropertyId::AssignedClientIdentifier,
            Self::ServerKeepAlive(_) => PropertyId::ServerKeepAlive,
            Self::AuthenticationMethod(_) => PropertyId::AuthenticationMethod,
            Self::AuthenticationData(_) => PropertyId::AuthenticationData,
            Self::RequestProblemInformation(_) => PropertyId::RequestProblemInformation,
            Self::WillDelayInterval(_) => PropertyId::WillDelayInterval,
            Self::RequestResponseInformation(_) => PropertyId::RequestResponseInformation,
            Self::ResponseInformation(_) => PropertyId::ResponseInformation,
            Self::ServerReference(_) => PropertyId::ServerReference,
            Self::ReasonString(_) => PropertyId::ReasonString,
            Self::ReceiveMaximum(_) => PropertyId::ReceiveMaximum,
            Self::TopicAliasMaximum(_) => PropertyId::TopicAliasMaximum,
            Self::TopicAlias(_) => PropertyId::TopicAlias,
            Self::MaximumQoS(_) => PropertyId::MaximumQoS,
            Self::RetainAvailable(_) => PropertyId::RetainAvailable,
            Self::UserProperty(..) => PropertyId::UserProperty,
            Self::MaximumPacketSize(_) => PropertyId::MaximumPacketSize,
            Self::WildcardSubscriptionAvailable(_) => PropertyId::WildcardSubscriptionAvailable,
            Self::SubscriptionIdentifierAvailable(_) => PropertyId::SubscriptionIdentifierAvailable,
            Self::SharedSubscriptionAvailable(_) => PropertyId::SharedSubscriptionAvailable,
        }
    }

    fn decode_value(id: PropertyId, ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Ok(match id {
            PropertyId::PayloadFormatIndicator => Self::PayloadFormatIndicator(ba.read_byte()?),
            PropertyId::MessageExpiryInterval => {
                Self::MessageExpiryInterval(U32Data::decode(ba)?.value())
            }
            PropertyId::ContentType => Self::ContentType(StringData::decode(ba)?.into()),
            PropertyId::ResponseTopic => Self::ResponseTopic(StringData::decode(ba)?.into()),
            PropertyId::CorrelationData => {
                Self::CorrelationData(BinaryData::decode(ba)?.as_ref().to_vec())
            }
            PropertyId::SubscriptionIdentifier => {
                Self::SubscriptionIdentifier(VarInt::decode(ba)?.value())
            }
            PropertyId::SessionExpiryInterval => {
                Self::SessionExpiryInterval(U32Data::decode(ba)?.value())
            }
            PropertyId::AssignedClientIdentifier => {
                Self::AssignedClientIdentifier(StringData::decode(ba)?.into())
            }
            PropertyId::ServerKeepAlive => Self::ServerKeepAlive(ba.read_u16()?),
            PropertyId::AuthenticationMethod => {
                Self::AuthenticationMethod(StringData::decode(ba)?.into())
            }
            PropertyId::AuthenticationData => {
                Self::AuthenticationData(BinaryData::decode(ba)?.as_ref().to_vec())
            }
            PropertyId::RequestProblemInformation => {
                Self::RequestProblemInformation(BoolData::decode(ba)?.value())
            }
            PropertyId::WillDelayInterval => Self::WillDelayInterval(U32Data::decode(ba)?.value()),
            PropertyId::RequestResponseInformation => {
                Self::RequestResponseInformation(BoolData::decode(ba)?.value())
            }
            PropertyId::ResponseInformation => {
                Self::ResponseInformation(StringData::decode(ba)?.into())
            }
            PropertyId::ServerReference => Self::ServerReference(StringData::decode(ba)?.into()),
            PropertyId::ReasonString => Self::ReasonString(StringData::decode(ba)?.into()),
            PropertyId::ReceiveMaximum => Self::ReceiveMaximum(ba.read_u16()?),
            PropertyId::TopicAliasMaximum => Self::TopicAliasMaximum(ba.read_u16()?),
            PropertyId::TopicAlias => Self::TopicAlias(ba.read_u16()?),
            PropertyId::MaximumQoS => Self::MaximumQoS(ba.read_byte()?),
            PropertyId::RetainAvailable => Self::RetainAvailable(BoolData::decode(ba)?.value()),
            PropertyId::UserProperty => {
                let pair = StringPairData::decode(ba)?;
                Self::UserProperty(pair.key().as_ref().to_string(), pair.value().as_ref().to_string())
            }
            PropertyId::MaximumPacketSize => Self::MaximumPacketSize(U32Data::decode(ba)?.value()),
            PropertyId::WildcardSubscriptionAvailable => {
                Self::WildcardSubscriptionAvailable(BoolData::decode(ba)?.value())
            }
            PropertyId::SubscriptionIdentifierAvailable => {
                Self::SubscriptionIdentifierAvailable(BoolData::decode(ba)?.value())
            }
            PropertyId::SharedSubscriptionAvailable => {
                Self::SharedSubscriptionAvailable(BoolData::decode(ba)?.value())
            }
        })
    }

    fn encode_value(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        match self {
            Self::PayloadFormatIndicator(v) | Self::MaximumQoS(v) => {
                buf.push(*v);
                Ok(1)
            }
            Self::MessageExpiryInterval(v)
            | Self::SessionExpiryInterval(v)
            | Self::WillDelayInterval(v)
            | Self::MaximumPacketSize(v) => U32Data::new(*v).encode(buf),
            Self::ContentType(s)
            | Self::ResponseTopic(s)
            | Self::AssignedClientIdentifier(s)
            | Self::AuthenticationMethod(s)
            | Self::ResponseInformation(s)
            | Self::ServerReference(s)
            | Self::ReasonString(s) => StringData::from(s)?.encode(buf),
            Self::CorrelationData(data) | Self::AuthenticationData(data) => {
                BinaryData::from_slice(data)?.encode(buf)
            }
            Self::SubscriptionIdentifier(v) => {
                VarInt::new(*v).map_err(|_| EncodeError::TooManyData)?.encode(buf)
            }
            Self::ServerKeepAlive(v) | Self::ReceiveMaximum(v) | Self::TopicAliasMaximum(v)
            | Self::TopicAlias(v) => {
                buf.extend_from_slice(&v.to_be_bytes());
                Ok(2)
            }
            Self::RequestProblemInformation(v)
            | Self::RequestResponseInformation(v)
            | Self::RetainAvailable(v)
            | Self::WildcardSubscriptionAvailable(v)
            | Self::SubscriptionIdentifierAvailable(v)
            | Self::SharedSubscriptionAvailable(v) => BoolData::new(*v).encode(buf),
            Self::UserProperty(k, v) => StringPairData::new(k, v)?.encode(buf),
        }
    }
}

/// An ordered, possibly-empty collection of v5 properties, as framed by a
/// leading Variable Byte Integer length.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.0.iter().find(|p| p.id() == id)
    }

    /// Decode a property section, rejecting ids not in `allowed` and
    /// duplicate single-instance properties.
    pub fn decode_allowed(ba: &mut ByteArray, allowed: &[PropertyId]) -> Result<Self, DecodeError> {
        let len = VarInt::decode(ba)?.value();
        let end_offset = ba.offset() + len;
        let mut seen: Vec<PropertyId> = Vec::new();
        let mut properties = Vec::new();
        while ba.offset() < end_offset {
            let id_value = VarInt::decode(ba)?.value();
            let id = PropertyId::try_from(id_value)?;
            if !allowed.contains(&id) {
                return Err(DecodeError::PropertyNotAllowed);
            }
            if seen.contains(&id) && !MULTIPLE_ALLOWED.contains(&id) {
                return Err(DecodeError::DuplicateProperty);
            }
            seen.push(id);
            properties.push(Property::decode_value(id, ba)?);
        }
        if ba.offset() != end_offset {
            return Err(DecodeError::InvalidRemainingLength);
        }
        Ok(Self(properties))
    }

    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let mut body = Vec::new();
        for property in &self.0 {
            VarInt::new(property.id() as u8 as usize)
                .map_err(|_| EncodeError::TooManyData)?
                .encode(&mut body)?;
            property.encode_value(&mut body)?;
        }
        let start = buf.len();
        VarInt::new(body.len())
            .map_err(|_| EncodeError::TooManyData)?
            .encode(buf)?;
        buf.extend_from_slice(&body);
        Ok(buf.len() - start)
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let mut buf = Vec::new();
        let _ = self.encode(&mut buf);
        buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECT_PROPS: &[PropertyId] = &[
        PropertyId::SessionExpiryInterval,
        PropertyId::ReceiveMaximum,
        PropertyId::UserProperty,
    ];

    #[test]
    fn roundtrip_mixed_properties() {
        let mut properties = Properties::new();
        properties.push(Property::SessionExpiryInterval(3600));
        properties.push(Property::ReceiveMaximum(10));
        properties.push(Property::UserProperty("lang".into(), "en".into()));

        let mut buf = Vec::new();
        properties.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode_allowed(&mut ba, CONNECT_PROPS).unwrap();
        assert_eq!(decoded, properties);
    }

    #[test]
    fn rejects_disallowed_property() {
        let mut properties = Properties::new();
        properties.push(Property::TopicAlias(1));
        let mut buf = Vec::new();
        properties.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_allowed(&mut ba, CONNECT_PROPS),
            Err(DecodeError::PropertyNotAllowed)
        );
    }

    #[test]
    fn rejects_duplicate_single_instance_property() {
        let mut buf = Vec::new();
        let mut body = Vec::new();
        VarInt::new(PropertyId::SessionExpiryInterval as usize)
            .unwrap()
            .encode(&mut body)
            .unwrap();
        U32Data::new(1).encode(&mut body).unwrap();
        VarInt::new(PropertyId::SessionExpiryInterval as usize)
            .unwrap()
            .encode(&mut body)
            .unwrap();
        U32Data::new(2).encode(&mut body).unwrap();
        VarInt::new(body.len()).unwrap().encode(&mut buf).unwrap();
        buf.extend_from_slice(&body);

        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_allowed(&mut ba, CONNECT_PROPS),
            Err(DecodeError::DuplicateProperty)
        );
    }

    #[test]
    fn allows_repeated_user_property() {
        let mut properties = Properties::new();
        properties.push(Property::UserProperty("a".into(), "1".into()));
        properties.push(Property::UserProperty("a".into(), "2".into()));
        let mut buf = Vec::new();
        properties.encode(&mut buf).unwrap();
        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode_allowed(&mut ba, CONNECT_PROPS).unwrap();
        assert_eq!(decoded, properties);
    }
}
