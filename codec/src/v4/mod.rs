//! MQTT 3.1.1 packet types.

mod ack_packets;
mod connect;
mod connect_ack;
mod ping;
mod publish;
mod subscribe;
mod subscribe_ack;
mod unsubscribe;

pub use ack_packets::{
    PublishAckPacket, PublishCompletePacket, PublishReceivedPacket, PublishReleasePacket,
    UnsubscribeAckPacket,
};
pub use connect::ConnectPacket;
pub use connect_ack::{ConnectAckPacket, ConnectReturnCode};
pub use ping::{DisconnectPacket, PingRequestPacket, PingResponsePacket};
pub use publish::PublishPacket;
pub use subscribe::{SubscribePacket, SubscribeTopic};
pub use subscribe_ack::{SubscribeAckPacket, SubscribeAckReason};
pub use unsubscribe::UnsubscribePacket;
