//! UseCase: ピア切断処理
//!
//! ピアを送信先から外してから、"peer disconnected" 遷移
//! （is_online = false, player_count = 0）を行います。

use std::sync::Arc;

use crate::domain::{MessagePusher, PeerId, ServerState, StoreError};

use super::SyncStateUseCase;

/// ピア切断のユースケース
pub struct DisconnectPeerUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    sync_state: Arc<SyncStateUseCase>,
}

impl DisconnectPeerUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, sync_state: Arc<SyncStateUseCase>) -> Self {
        Self {
            message_pusher,
            sync_state,
        }
    }

    /// ピア切断を実行
    ///
    /// 他のピアが接続中でも状態はオフラインにリセットされる（単一ピア前提）。
    pub async fn execute(&self, peer_id: &PeerId) -> Result<ServerState, StoreError> {
        if !self.message_pusher.unregister_peer(peer_id).await {
            tracing::debug!("Peer '{}' was already removed from the live set", peer_id);
        }
        self.sync_state.peer_disconnected().await
    }
}
