use thiserror::Error;

/// Error surfaced to a `client` caller. Unlike the broker, which logs and
/// terminates, every one of these propagates to whichever method the caller
/// invoked.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("malformed packet: {0}")]
    Decode(#[from] codec::DecodeError),

    #[error("failed to encode outgoing packet: {0}")]
    Encode(#[from] codec::EncodeError),

    #[error("transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("subscription mux error: {0}")]
    Mux(#[from] mux::MuxError),

    #[error("server refused the connection: {0:?}")]
    ConnectRefused(String),

    #[error("connection is not established")]
    NotConnected,
}
