use crate::EncodeError;

/// A concrete topic a message is published to. Unlike a filter, a topic name
/// must not contain `+` or `#` and must not be empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(topic: &str) -> Result<Self, EncodeError> {
        if topic.is_empty() || topic.len() > u16::MAX as usize {
            return Err(EncodeError::InvalidTopic);
        }
        if topic.split('/').any(|part| part == "+" || part == "#") {
            return Err(EncodeError::InvalidTopic);
        }
        Ok(Self(topic.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A topic filter as supplied to SUBSCRIBE: may contain `+` (single level)
/// and `#` (multi level, trailing position only) wildcards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicFilter(String);

impl TopicFilter {
    pub fn new(filter: &str) -> Result<Self, EncodeError> {
        if filter.is_empty() || filter.len() > u16::MAX as usize {
            return Err(EncodeError::InvalidTopic);
        }
        let parts: Vec<&str> = filter.split('/').collect();
        for (i, part) in parts.iter().enumerate() {
            let is_last = i + 1 == parts.len();
            if part.contains('#') && (*part != "#" || !is_last) {
                return Err(EncodeError::InvalidTopic);
            }
            if part.contains('+') && *part != "+" {
                return Err(EncodeError::InvalidTopic);
            }
        }
        Ok(Self(filter.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TopicFilter {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_name_rejects_wildcards() {
        assert!(TopicName::new("a/+/c").is_err());
        assert!(TopicName::new("a/#").is_err());
        assert!(TopicName::new("").is_err());
        assert!(TopicName::new("a/b/c").is_ok());
    }

    #[test]
    fn filter_allows_trailing_hash_only() {
        assert!(TopicFilter::new("a/#").is_ok());
        assert!(TopicFilter::new("a/#/b").is_err());
        assert!(TopicFilter::new("a/b#").is_err());
    }

    #[test]
    fn filter_plus_must_occupy_whole_level() {
        assert!(TopicFilter::new("a/+/c").is_ok());
        assert!(TopicFilter::new("a/b+/c").is_err());
    }
}
