//! UseCase: 接続ライフサイクルと受信メッセージのストアへの反映
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 接続・切断・status・player・chat の各イベントがストアと購読者に正しく反映されること
//!
//! ### なぜこのテストが必要か
//! - 受理したイベント 1 件につき "state changed" 通知がちょうど 1 回発火することを保証
//! - ストア書き込みに失敗した場合は通知しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：接続 → status / player / chat → 切断
//! - 異常系：ストアが利用できない

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::domain::{Envelope, ServerState, ServerStateRepository, StoreError};

use super::NotificationPorts;

/// Result of applying one inbound envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Store was written and "state changed" fired
    StateChanged(ServerState),
    /// Chat was forwarded to the chat subscriber
    ChatRelayed,
}

/// State synchronizer (Offline ⇄ Online).
///
/// Every event is handled under one lock, including its store write and the
/// subscriber callback, so events are applied strictly in arrival order.
pub struct SyncStateUseCase {
    repository: Arc<dyn ServerStateRepository>,
    notifier: Arc<NotificationPorts>,
    /// Last state written through this synchronizer
    snapshot: RwLock<ServerState>,
    sequencer: Mutex<()>,
}

impl SyncStateUseCase {
    /// # Arguments
    ///
    /// * `repository` - 永続化ストア
    /// * `notifier` - 購読者スロット
    /// * `initial` - ストアから読み出した現在の状態
    pub fn new(
        repository: Arc<dyn ServerStateRepository>,
        notifier: Arc<NotificationPorts>,
        initial: ServerState,
    ) -> Self {
        Self {
            repository,
            notifier,
            snapshot: RwLock::new(initial),
            sequencer: Mutex::new(()),
        }
    }

    /// Peer connected: `is_online = true`
    pub async fn peer_connected(&self) -> Result<ServerState, StoreError> {
        let _guard = self.sequencer.lock().await;
        let state = self.repository.update_server_state(true, None, None).await?;
        Ok(self.commit(state))
    }

    /// Peer disconnected: `is_online = false`, `player_count = 0`
    pub async fn peer_disconnected(&self) -> Result<ServerState, StoreError> {
        let _guard = self.sequencer.lock().await;
        let state = self
            .repository
            .update_server_state(false, Some(0), None)
            .await?;
        Ok(self.commit(state))
    }

    /// Apply one decoded inbound envelope
    pub async fn apply(&self, envelope: Envelope) -> Result<SyncOutcome, StoreError> {
        let _guard = self.sequencer.lock().await;
        match envelope {
            Envelope::Status {
                online,
                player_count,
            } => {
                let state = self
                    .repository
                    .update_server_state(online, player_count, None)
                    .await?;
                Ok(SyncOutcome::StateChanged(self.commit(state)))
            }
            Envelope::Player { count } => {
                let state = self.repository.update_player_count(count).await?;
                Ok(SyncOutcome::StateChanged(self.commit(state)))
            }
            Envelope::Chat { player, message } => {
                tracing::debug!("Chat from '{}': {}", player, message);
                self.notifier.notify_chat_received(&player, &message);
                Ok(SyncOutcome::ChatRelayed)
            }
        }
    }

    /// Store a resolved public address
    pub async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError> {
        let _guard = self.sequencer.lock().await;
        let state = self.repository.update_public_ip(ip).await?;
        Ok(self.commit(state))
    }

    /// Last state written through this synchronizer, without touching the store
    pub fn snapshot(&self) -> ServerState {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn commit(&self, state: ServerState) -> ServerState {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = state.clone();
        self.notifier.notify_state_changed();
        state
    }
}
