//! Server state shared by the handlers.

use std::{
    pin::pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::{Notify, watch};

use crate::{
    domain::{MessagePusher, ServerStateRepository},
    usecase::{ConnectPeerUseCase, DisconnectPeerUseCase, SyncStateUseCase},
};

/// Shared application state
pub struct AppState {
    /// ConnectPeerUseCase（ピア接続のユースケース）
    pub connect_peer_usecase: Arc<ConnectPeerUseCase>,
    /// DisconnectPeerUseCase（ピア切断のユースケース）
    pub disconnect_peer_usecase: Arc<DisconnectPeerUseCase>,
    /// SyncStateUseCase（受信メッセージの反映）
    pub sync_state_usecase: Arc<SyncStateUseCase>,
    /// Repository（HTTP API からの読み出し用）
    pub repository: Arc<dyn ServerStateRepository>,
    /// MessagePusher（ピア数の取得用）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// `true` once the server is stopping
    pub shutdown: watch::Receiver<bool>,
    pub connections: Arc<ConnectionTracker>,
}

/// Counts socket tasks that have not finished their disconnect transition yet
#[derive(Default)]
pub struct ConnectionTracker {
    active: AtomicUsize,
    idle: Notify,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a socket task as running until the guard is dropped
    pub fn enter(self: &Arc<Self>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            tracker: self.clone(),
        }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until every socket task has finished, up to `timeout`.
    ///
    /// Returns `false` on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let mut notified = pin!(self.idle.notified());
                notified.as_mut().enable();
                if self.active() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.tracker.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
