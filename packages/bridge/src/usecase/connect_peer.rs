//! UseCase: ピア接続処理
//!
//! ピアを送信先として登録してから、"peer connected" 遷移（is_online = true）を行います。

use std::sync::Arc;

use crate::domain::{MessagePusher, PeerChannel, PeerId, ServerState, StoreError};

use super::SyncStateUseCase;

/// ピア接続のユースケース
pub struct ConnectPeerUseCase {
    /// MessagePusher（ピア集合の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    sync_state: Arc<SyncStateUseCase>,
}

impl ConnectPeerUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, sync_state: Arc<SyncStateUseCase>) -> Self {
        Self {
            message_pusher,
            sync_state,
        }
    }

    /// ピア接続を実行
    ///
    /// ストアへの書き込みに失敗してもピアは登録されたままになる（エラーは呼び出し元に返す）。
    pub async fn execute(
        &self,
        peer_id: PeerId,
        sender: PeerChannel,
    ) -> Result<ServerState, StoreError> {
        self.message_pusher.register_peer(peer_id, sender).await;
        self.sync_state.peer_connected().await
    }
}
