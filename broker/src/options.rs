/// Knobs for a [`crate::Broker`] instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrokerOptions {
    /// Publish `$SYS/brokers/<clientid>/{connected,disconnected}` events
    /// through the broker's own mux as sessions come and go.
    pub sys_events_enabled: bool,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            sys_events_enabled: false,
        }
    }
}
