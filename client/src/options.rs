use std::time::Duration;

use codec::ProtocolVersion;

/// Connection parameters for [`crate::Client::connect`], mirroring the
/// teacher's `ruo::ConnectOptions`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub protocol_version: ProtocolVersion,
    pub keep_alive: u16,
    /// How long to wait for CONNACK before giving up. `None` blocks
    /// indefinitely on the transport's existing timeout setting.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            username: None,
            password: None,
            protocol_version: ProtocolVersion::V4,
            keep_alive: 60,
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}
