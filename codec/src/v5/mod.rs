//! MQTT 5.0 packet types.

mod ack_packets;
mod auth;
mod connect;
mod connect_ack;
mod disconnect;
mod ping;
pub mod property;
mod publish;
mod subscribe;
mod subscribe_ack;
mod unsubscribe;

pub use ack_packets::{
    PublishAckPacket, PublishCompletePacket, PublishReceivedPacket, PublishReleasePacket,
};
pub use auth::{AuthPacket, AuthReasonCode};
pub use connect::ConnectPacket;
pub use connect_ack::{ConnectAckPacket, ConnectReasonCode};
pub use disconnect::{DisconnectPacket, DisconnectReasonCode};
pub use ping::{PingRequestPacket, PingResponsePacket};
pub use property::{Properties, Property, PropertyId};
pub use publish::PublishPacket;
pub use subscribe::{SubscribeOptions, SubscribePacket, SubscribeTopic};
pub use subscribe_ack::{SubscribeAckPacket, SubscribeReasonCode};
pub use unsubscribe::{UnsubscribeAckPacket, UnsubscribePacket};
