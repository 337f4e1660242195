//! MessagePusher trait 定義
//!
//! 接続中のピアへのメッセージ送信（通知）のインターフェース。
//! 具体的な実装は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BroadcastReport, PeerId};

/// ピアごとの送信キュー（容量付き）
pub type PeerChannel = mpsc::Sender<String>;

/// Live-peer set with a broadcast primitive
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// ピアを登録
    async fn register_peer(&self, peer_id: PeerId, sender: PeerChannel);

    /// ピアを登録解除（登録されていた場合は true）
    async fn unregister_peer(&self, peer_id: &PeerId) -> bool;

    /// 全ピアに送信。送信できなかったピアはスキップされ、レポートに記録される
    async fn broadcast(&self, content: &str) -> BroadcastReport;

    /// 全ピアの送信キューを閉じる（各ピアの接続は終了する）
    async fn close_all(&self) -> usize;

    /// 接続中のピア数
    async fn count(&self) -> usize;
}
