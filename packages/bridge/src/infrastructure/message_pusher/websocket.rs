//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続中ピアの送信キュー（`mpsc::Sender`）を管理
//! - 全ピアへのブロードキャスト
//!
//! ## 設計ノート
//!
//! ソケットへの書き込みは UI 層（`ui/handler/websocket.rs`）のピアごとのタスクが行います。
//! ここでは容量付きキューに `try_send` するだけなので、遅いピアがいても
//! ブロードキャストが止まることはありません。キューが満杯のピアへのフレームは破棄されます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{BroadcastReport, MessagePusher, PeerChannel, PeerId, PeerWriteError};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中のピアの送信キュー
    peers: Arc<Mutex<HashMap<PeerId, PeerChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Non-blocking peer count for synchronous callers.
    ///
    /// Returns `None` while the peer set is being modified.
    pub fn try_count(&self) -> Option<usize> {
        self.peers.try_lock().ok().map(|peers| peers.len())
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_peer(&self, peer_id: PeerId, sender: PeerChannel) {
        let mut peers = self.peers.lock().await;
        peers.insert(peer_id, sender);
        tracing::debug!("Peer '{}' registered ({} live)", peer_id, peers.len());
    }

    async fn unregister_peer(&self, peer_id: &PeerId) -> bool {
        let mut peers = self.peers.lock().await;
        let removed = peers.remove(peer_id).is_some();
        tracing::debug!("Peer '{}' unregistered ({} live)", peer_id, peers.len());
        removed
    }

    async fn broadcast(&self, content: &str) -> BroadcastReport {
        let peers = self.peers.lock().await;
        let mut report = BroadcastReport::default();

        for (peer_id, sender) in peers.iter() {
            // ブロードキャストでは一部の送信失敗を許容
            match sender.try_send(content.to_string()) {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::debug!("Queued frame for peer '{}'", peer_id);
                }
                Err(TrySendError::Full(_)) => {
                    let err = PeerWriteError::QueueFull(*peer_id);
                    tracing::warn!("{}", err);
                    report.failed.push(err);
                }
                Err(TrySendError::Closed(_)) => {
                    let err = PeerWriteError::Disconnected(*peer_id);
                    tracing::warn!("{}", err);
                    report.failed.push(err);
                }
            }
        }

        report
    }

    async fn close_all(&self) -> usize {
        let mut peers = self.peers.lock().await;
        let closed = peers.len();
        // Sender を drop するとピアの送信タスクが終了し、接続が閉じられる
        peers.clear();
        closed
    }

    async fn count(&self) -> usize {
        self.peers.lock().await.len()
    }
}
