//! Infrastructure layer: wire codec, persistence, peer fan-out and outbound
//! HTTP lookups.

pub mod codec;
pub mod dto;
pub mod message_pusher;
pub mod public_ip;
pub mod repository;
