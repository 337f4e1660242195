//! WebSocket message DTOs exchanged with the game-server plugin.
//!
//! Inbound fields are all optional here; presence is checked when converting
//! into a domain [`Envelope`](crate::domain::Envelope).

use serde::{Deserialize, Serialize};

/// Value of the `type` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Status,
    Player,
    Chat,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Status => "status",
            MessageType::Player => "player",
            MessageType::Chat => "chat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "status" => Some(MessageType::Status),
            "player" => Some(MessageType::Player),
            "chat" => Some(MessageType::Chat),
            _ => None,
        }
    }
}

/// `{"type":"status","online":true,"playerCount":5}`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusMessage {
    pub online: Option<bool>,
    #[serde(rename = "playerCount", default)]
    pub player_count: Option<u32>,
}

/// `{"type":"player","count":3}`
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerMessage {
    pub count: Option<u32>,
}

/// `{"type":"chat","player":"Alice","message":"hi"}`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub player: Option<String>,
    pub message: Option<String>,
}

/// Outbound chat relayed to the plugin: `{"type":"chat","sender":"Bot","message":"hello"}`
#[derive(Debug, Clone, Serialize)]
pub struct OutboundChatMessage<'a> {
    pub sender: &'a str,
    pub message: &'a str,
}
