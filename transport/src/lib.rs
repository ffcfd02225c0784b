//! Blocking byte-stream transport contract.
//!
//! This crate knows nothing about MQTT: it is the narrow seam between a real
//! socket (owned by a caller, out of scope here) and everything above it
//! (`mux`, `broker`, `client`). The only implementation shipped here is an
//! in-memory duplex pipe used by the rest of the workspace's tests.

mod duplex;
mod error;

use std::time::Duration;

pub use duplex::DuplexPipe;
pub use error::TransportError;

/// A blocking, bidirectional byte stream.
///
/// Implementations must be `Send` so a caller can hand one off to a thread
/// spawned for the life of a single connection.
pub trait Transport: Send {
    /// Write `buf` in full, returning the number of bytes written.
    fn send(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    /// Read at least one byte into `buf`, returning the number read.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Bound how long `recv` may block before returning
    /// `TransportError::Timeout`. `None` means block indefinitely.
    fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self) -> Result<(), TransportError>;
}
