//! UseCase: 接続中のピアへのメッセージ中継
//!
//! ペイロードを一度だけエンコードし、全ピアにブロードキャストします。
//! ピアがいない場合は何もしません（キューイングも再送もしない）。

use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::{BroadcastReport, EncodeError, MessagePusher},
    infrastructure::{
        codec,
        dto::websocket::{MessageType, OutboundChatMessage},
    },
};

/// メッセージ中継のユースケース
pub struct RelayMessageUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelayMessageUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// `{"type": kind, ...payload}` を全ピアに送信
    pub async fn broadcast<T>(&self, kind: &str, payload: &T) -> Result<BroadcastReport, EncodeError>
    where
        T: Serialize + ?Sized + Sync,
    {
        let frame = codec::encode(kind, payload)?;
        let report = self.message_pusher.broadcast(&frame).await;
        if report.is_noop() {
            tracing::debug!("No live peers, dropped '{}' frame", kind);
        } else {
            tracing::debug!(
                "Broadcast '{}' to {} peer(s), {} skipped",
                kind,
                report.delivered,
                report.failed.len()
            );
        }
        Ok(report)
    }

    /// チャットをゲームサーバーに送信: `{"type":"chat","sender":...,"message":...}`
    pub async fn send_chat(
        &self,
        sender: &str,
        message: &str,
    ) -> Result<BroadcastReport, EncodeError> {
        let payload = OutboundChatMessage { sender, message };
        self.broadcast(MessageType::Chat.as_str(), &payload).await
    }
}
