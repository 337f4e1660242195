//! DTO → ドメインモデル変換
//!
//! 必須フィールドが欠けている DTO は `DecodeError::MissingField` になります。

use crate::domain::{DecodeError, Envelope};

use super::websocket::{ChatMessage, PlayerMessage, StatusMessage};

impl TryFrom<StatusMessage> for Envelope {
    type Error = DecodeError;

    fn try_from(dto: StatusMessage) -> Result<Self, Self::Error> {
        let online = dto.online.ok_or(DecodeError::MissingField {
            kind: "status",
            field: "online",
        })?;
        Ok(Envelope::Status {
            online,
            player_count: dto.player_count,
        })
    }
}

impl TryFrom<PlayerMessage> for Envelope {
    type Error = DecodeError;

    fn try_from(dto: PlayerMessage) -> Result<Self, Self::Error> {
        let count = dto.count.ok_or(DecodeError::MissingField {
            kind: "player",
            field: "count",
        })?;
        Ok(Envelope::Player { count })
    }
}

impl TryFrom<ChatMessage> for Envelope {
    type Error = DecodeError;

    fn try_from(dto: ChatMessage) -> Result<Self, Self::Error> {
        // 空文字列は未指定と同じ扱い
        let player = non_empty(dto.player).ok_or(DecodeError::MissingField {
            kind: "chat",
            field: "player",
        })?;
        let message = non_empty(dto.message).ok_or(DecodeError::MissingField {
            kind: "chat",
            field: "message",
        })?;
        Ok(Envelope::Chat { player, message })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
