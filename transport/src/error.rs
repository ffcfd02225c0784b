use std::fmt;

/// Error produced by a `Transport` implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The write side failed or the peer is no longer accepting bytes.
    Send(String),

    /// The read side failed for a reason other than a timeout or a close.
    Recv(String),

    /// `recv` did not observe any bytes within the configured timeout.
    Timeout,

    /// The peer closed the connection (or this side already called `close`).
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(msg) => write!(f, "transport send failed: {msg}"),
            Self::Recv(msg) => write!(f, "transport recv failed: {msg}"),
            Self::Timeout => f.write_str("transport recv timed out"),
            Self::Closed => f.write_str("transport is closed"),
        }
    }
}

impl std::error::Error for TransportError {}
