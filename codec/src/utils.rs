use std::fmt;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Generate a random alphanumeric string, useful for a client id a caller
/// doesn't care to choose themselves.
#[must_use]
pub fn random_string(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIdError {
    Empty,
    TooLong,
    InvalidChars,
}

impl fmt::Display for ClientIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Empty => "client id is empty",
            Self::TooLong => "client id exceeds 23 bytes",
            Self::InvalidChars => "client id contains characters outside [0-9a-zA-Z]",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ClientIdError {}

/// Validate a client id against the conservative rule in
/// [MQTT-3.1.3-5]: 1-23 bytes, limited to `0-9a-zA-Z`. A server is free to
/// accept a wider range (this crate's broker does, as allowed by
/// [MQTT-3.1.3-4]); this check is offered for callers who want to stay
/// within the portable subset every broker must accept.
pub fn validate_client_id(client_id: &str) -> Result<(), ClientIdError> {
    if client_id.is_empty() {
        return Err(ClientIdError::Empty);
    }
    if client_id.len() > 23 {
        return Err(ClientIdError::TooLong);
    }
    if !client_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ClientIdError::InvalidChars);
    }
    Ok(())
}
