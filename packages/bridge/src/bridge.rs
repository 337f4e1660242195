//! Collaborator-facing facade.
//!
//! `Bridge` owns the store, the live-peer set and the state synchronizer, and
//! exposes the operations the rest of the bot uses: subscribing to state and
//! chat events, sending chat to the game server and starting/stopping the
//! listener.

use std::{net::SocketAddr, sync::Arc};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    domain::{
        BindError, BroadcastReport, CachedStatusArtifact, EncodeError, MessagePusher,
        ServerState, ServerStateRepository, StatusSurface, StoreError,
    },
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::{Server, ServerHandle},
    usecase::{
        ConnectPeerUseCase, DisconnectPeerUseCase, NotificationPorts, RefreshError,
        RefreshOutcome, RefreshStatusArtifactUseCase, RelayMessageUseCase,
        ShutdownStatusArtifactUseCase, SyncStateUseCase,
    },
};

pub struct Bridge {
    repository: Arc<dyn ServerStateRepository>,
    message_pusher: Arc<WebSocketMessagePusher>,
    notifier: Arc<NotificationPorts>,
    sync_state_usecase: Arc<SyncStateUseCase>,
    connect_peer_usecase: Arc<ConnectPeerUseCase>,
    disconnect_peer_usecase: Arc<DisconnectPeerUseCase>,
    relay_message_usecase: RelayMessageUseCase,
    refresh_status_artifact_usecase: RefreshStatusArtifactUseCase,
    shutdown_status_artifact_usecase: ShutdownStatusArtifactUseCase,
    server: Mutex<Option<ServerHandle>>,
}

impl Bridge {
    /// Wire the bridge around a store.
    ///
    /// Reads the persisted state once to seed [`Bridge::snapshot`].
    pub async fn new(repository: Arc<dyn ServerStateRepository>) -> Result<Self, StoreError> {
        let initial = repository.get_server_state().await?;

        let message_pusher = Arc::new(WebSocketMessagePusher::new());
        let pusher: Arc<dyn MessagePusher> = message_pusher.clone();
        let notifier = Arc::new(NotificationPorts::new());

        let sync_state_usecase = Arc::new(SyncStateUseCase::new(
            repository.clone(),
            notifier.clone(),
            initial,
        ));
        let connect_peer_usecase = Arc::new(ConnectPeerUseCase::new(
            pusher.clone(),
            sync_state_usecase.clone(),
        ));
        let disconnect_peer_usecase = Arc::new(DisconnectPeerUseCase::new(
            pusher.clone(),
            sync_state_usecase.clone(),
        ));
        let relay_message_usecase = RelayMessageUseCase::new(pusher);
        let refresh_status_artifact_usecase = RefreshStatusArtifactUseCase::new(repository.clone());
        let shutdown_status_artifact_usecase =
            ShutdownStatusArtifactUseCase::new(repository.clone());

        Ok(Self {
            repository,
            message_pusher,
            notifier,
            sync_state_usecase,
            connect_peer_usecase,
            disconnect_peer_usecase,
            relay_message_usecase,
            refresh_status_artifact_usecase,
            shutdown_status_artifact_usecase,
            server: Mutex::new(None),
        })
    }

    /// Register the "state changed" subscriber, replacing any previous one
    pub fn on_state_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.on_state_changed(callback);
    }

    /// Register the "chat received" subscriber, replacing any previous one
    pub fn on_chat_received<F>(&self, callback: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.notifier.on_chat_received(callback);
    }

    /// Relay a chat line to every live peer
    pub async fn send_chat(
        &self,
        sender: &str,
        message: &str,
    ) -> Result<BroadcastReport, EncodeError> {
        self.relay_message_usecase.send_chat(sender, message).await
    }

    /// Send `{"type": kind, ...payload}` to every live peer
    pub async fn broadcast<T>(&self, kind: &str, payload: &T) -> Result<BroadcastReport, EncodeError>
    where
        T: Serialize + ?Sized + Sync,
    {
        self.relay_message_usecase.broadcast(kind, payload).await
    }

    /// Current canonical state, read from the store
    pub async fn server_state(&self) -> Result<ServerState, StoreError> {
        self.repository.get_server_state().await
    }

    /// Last state written through the bridge, without touching the store
    pub fn snapshot(&self) -> ServerState {
        self.sync_state_usecase.snapshot()
    }

    /// Store the host's public address and notify the state subscriber
    pub async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError> {
        self.sync_state_usecase.update_public_ip(ip).await
    }

    pub async fn cached_status_artifact(&self) -> Result<Option<CachedStatusArtifact>, StoreError> {
        self.repository.get_cached_status_artifact().await
    }

    pub async fn save_cached_status_artifact(
        &self,
        artifact_id: String,
        surface_id: String,
    ) -> Result<CachedStatusArtifact, StoreError> {
        self.repository
            .save_cached_status_artifact(artifact_id, surface_id)
            .await
    }

    /// Re-render the status artifact on `surface`, editing it in place when possible
    pub async fn refresh_status_artifact(
        &self,
        surface: &dyn StatusSurface,
    ) -> Result<RefreshOutcome, RefreshError> {
        self.refresh_status_artifact_usecase.execute(surface).await
    }

    /// Switch the cached status artifact to the "bot stopped" view.
    ///
    /// Call before [`Bridge::stop`]. Returns the artifact that was rewritten,
    /// or `None` when there is nothing cached or it no longer exists.
    pub async fn render_shutdown_status(
        &self,
        surface: &dyn StatusSurface,
    ) -> Result<Option<CachedStatusArtifact>, RefreshError> {
        self.shutdown_status_artifact_usecase.execute(surface).await
    }

    pub async fn live_connection_count(&self) -> usize {
        self.message_pusher.count().await
    }

    /// Non-blocking variant of [`Bridge::live_connection_count`] for use inside callbacks
    pub fn try_live_connection_count(&self) -> Option<usize> {
        self.message_pusher.try_count()
    }

    /// Start accepting peers on `host:port` and return the bound address.
    ///
    /// Calling `start` while already running returns the current address.
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr, BindError> {
        let mut server = self.server.lock().await;
        if let Some(handle) = server.as_ref() {
            tracing::warn!("Bridge already running on {}", handle.local_addr());
            return Ok(handle.local_addr());
        }

        let handle = Server::new(
            self.connect_peer_usecase.clone(),
            self.disconnect_peer_usecase.clone(),
            self.sync_state_usecase.clone(),
            self.repository.clone(),
            self.message_pusher.clone(),
        )
        .start(host, port)
        .await?;

        let local_addr = handle.local_addr();
        *server = Some(handle);
        Ok(local_addr)
    }

    /// Stop the listener and close every live peer. No-op when not running.
    pub async fn stop(&self) {
        let handle = self.server.lock().await.take();
        match handle {
            Some(handle) => handle.stop().await,
            None => tracing::debug!("Bridge is not running"),
        }
    }
}
