//! Server execution logic.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tokio::{
    net::TcpListener,
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tower_http::trace::TraceLayer;

use crate::{
    domain::{BindError, MessagePusher, ServerStateRepository},
    usecase::{ConnectPeerUseCase, DisconnectPeerUseCase, SyncStateUseCase},
};

use super::{
    handler::{get_state, health_check, websocket_handler},
    state::{AppState, ConnectionTracker},
};

/// How long `stop()` waits for socket tasks to finish their disconnect transition
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket bridge server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(connect_peer_usecase, disconnect_peer_usecase, sync_state_usecase, repository, message_pusher);
/// let handle = server.start("0.0.0.0", 8080).await?;
/// handle.stop().await;
/// ```
pub struct Server {
    /// ConnectPeerUseCase（ピア接続のユースケース）
    connect_peer_usecase: Arc<ConnectPeerUseCase>,
    /// DisconnectPeerUseCase（ピア切断のユースケース）
    disconnect_peer_usecase: Arc<DisconnectPeerUseCase>,
    /// SyncStateUseCase（受信メッセージの反映）
    sync_state_usecase: Arc<SyncStateUseCase>,
    repository: Arc<dyn ServerStateRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl Server {
    pub fn new(
        connect_peer_usecase: Arc<ConnectPeerUseCase>,
        disconnect_peer_usecase: Arc<DisconnectPeerUseCase>,
        sync_state_usecase: Arc<SyncStateUseCase>,
        repository: Arc<dyn ServerStateRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connect_peer_usecase,
            disconnect_peer_usecase,
            sync_state_usecase,
            repository,
            message_pusher,
        }
    }

    /// Bind the listener and serve in a background task
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "0.0.0.0")
    /// * `port` - The port number to bind to (`0` picks a free port)
    ///
    /// # Errors
    ///
    /// Returns [`BindError`] if the address cannot be bound.
    pub async fn start(self, host: &str, port: u16) -> Result<ServerHandle, BindError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| BindError {
                addr: bind_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| BindError {
            addr: bind_addr.clone(),
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connections = Arc::new(ConnectionTracker::new());

        let app_state = Arc::new(AppState {
            connect_peer_usecase: self.connect_peer_usecase,
            disconnect_peer_usecase: self.disconnect_peer_usecase,
            sync_state_usecase: self.sync_state_usecase,
            repository: self.repository,
            message_pusher: self.message_pusher.clone(),
            shutdown: shutdown_rx.clone(),
            connections: connections.clone(),
        });

        let app = router(app_state);

        let mut graceful = shutdown_rx;
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = graceful.wait_for(|stopping| *stopping).await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Bridge server error: {}", e);
            }
        });

        tracing::info!("Bridge listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws", local_addr);

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            message_pusher: self.message_pusher,
            connections,
            task: Mutex::new(Some(task)),
        })
    }
}

fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/state", get(get_state))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Running server
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    message_pusher: Arc<dyn MessagePusher>,
    connections: Arc<ConnectionTracker>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the listener and every live peer.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            tracing::debug!("Bridge already stopped");
            return;
        };

        self.shutdown_tx.send_replace(true);
        let closed = self.message_pusher.close_all().await;
        tracing::info!("Closing {} live peer(s)", closed);

        if !self.connections.wait_idle(DRAIN_TIMEOUT).await {
            tracing::warn!(
                "{} peer task(s) still running after {:?}",
                self.connections.active(),
                DRAIN_TIMEOUT
            );
        }

        if let Err(e) = handle.await {
            tracing::error!("Bridge server task failed: {}", e);
        }

        tracing::info!("Bridge stopped");
    }
}
