//! Blocking MQTT broker session runner.
//!
//! A [`Broker`] owns nothing but a shared [`mux::Mux`] and a set of
//! [`BrokerOptions`]; it never opens a listening socket. The caller runs its
//! own accept loop and hands each accepted connection's [`transport::Transport`]
//! to [`Broker::serve_conn`], typically from a freshly spawned thread.

mod error;
mod options;
mod session;

use std::sync::Arc;
use std::time::Instant;

use mux::Mux;
use transport::Transport;

pub use error::BrokerError;
pub use options::BrokerOptions;

pub struct Broker {
    mux: Arc<Mux>,
    options: BrokerOptions,
}

impl Broker {
    #[must_use]
    pub fn new(mux: Arc<Mux>, options: BrokerOptions) -> Self {
        Self { mux, options }
    }

    /// Run one client session to completion on the calling thread. Returns
    /// once the session closes, whether cleanly (DISCONNECT, keep-alive
    /// timeout) or due to a transport/protocol error.
    pub fn serve_conn<T>(&self, transport: T, clock: &dyn Fn() -> Instant) -> Result<(), BrokerError>
    where
        T: Transport + 'static,
    {
        session::run(&self.mux, self.options, transport, clock)
    }
}
