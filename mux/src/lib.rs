//! Topic-filter trie and subscription multiplexer.
//!
//! Everything here is synchronous and transport-agnostic: a `Mux` is a
//! shared table of topic-filter -> handler registrations that a broker or
//! client dispatches incoming publishes through.

mod mux;
mod trie;

pub use mux::{Handler, HandlerId, Message, Mux, MuxError};
pub use trie::Trie;
