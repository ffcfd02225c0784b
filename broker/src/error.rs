use thiserror::Error;

/// Error a session can raise while running. `Broker::serve_conn` returns
/// this to its caller for logging; it is never retried internally.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("malformed packet: {0}")]
    Decode(#[from] codec::DecodeError),

    #[error("failed to encode outgoing packet: {0}")]
    Encode(#[from] codec::EncodeError),

    #[error("transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("subscription mux error: {0}")]
    Mux(#[from] mux::MuxError),

    #[error("protocol error: {0}")]
    Protocol(String),
}
