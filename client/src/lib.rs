//! Blocking MQTT client built on the shared `transport`/`mux` pair.
//!
//! Unlike the teacher's `ruo::sync_client`, which owns a background read
//! thread, `Client` is driven entirely by [`Client::poll`] so the caller
//! decides when and on which thread reads happen.
mod client;
mod error;
mod options;

pub use client::Client;
pub use error::ClientError;
pub use options::ClientOptions;
