//! WebSocket connection handlers.
//!
//! Each peer gets two tasks: one reading frames from the socket and one
//! draining the peer's outbound queue into the socket. Whichever ends first
//! winds the other down, then the peer is disconnected.

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use tokio::sync::{mpsc, oneshot};

use crate::{domain::PeerId, infrastructure::codec, ui::state::AppState};

/// Outbound frames buffered per peer before broadcasts start dropping
pub const PEER_QUEUE_CAPACITY: usize = 64;

/// Upper bound for a single socket write
pub const PEER_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drains the peer's queue into the socket.
///
/// Ends when the queue is closed (peer removed or server stopping), when a
/// write fails, or when a write exceeds [`PEER_WRITE_TIMEOUT`].
fn pusher_loop<S>(
    peer_id: PeerId,
    mut rx: mpsc::Receiver<String>,
    mut sender: S,
) -> tokio::task::JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Display,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match tokio::time::timeout(PEER_WRITE_TIMEOUT, sender.send(Message::Text(frame.into())))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Write to peer '{}' failed: {}", peer_id, e);
                    return;
                }
                Err(_) => {
                    tracing::warn!(
                        "Write to peer '{}' timed out after {:?}, disconnecting",
                        peer_id,
                        PEER_WRITE_TIMEOUT
                    );
                    return;
                }
            }
        }

        // キューが閉じられた: 接続を閉じる
        let _ = tokio::time::timeout(PEER_WRITE_TIMEOUT, sender.send(Message::Close(None))).await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let _connection = state.connections.enter();
    let mut shutdown = state.shutdown.clone();
    let stopping = *shutdown.borrow();
    if stopping {
        tracing::debug!("Rejecting peer while the bridge is stopping");
        return;
    }

    let peer_id = PeerId::generate();
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel(PEER_QUEUE_CAPACITY);

    match state.connect_peer_usecase.execute(peer_id, tx).await {
        Ok(server_state) => tracing::info!(
            "Peer '{}' connected (online: {})",
            peer_id,
            server_state.is_online
        ),
        Err(e) => tracing::error!("Failed to record connection of peer '{}': {}", peer_id, e),
    }

    let sync_state = state.sync_state_usecase.clone();
    let (stop_recv_tx, mut stop_recv_rx) = oneshot::channel::<()>();

    // Spawn a task to receive frames from this peer.
    // It only stops between frames so an applied frame always reaches the subscriber.
    let mut recv_task = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                next = receiver.next() => next,
                _ = &mut stop_recv_rx => break,
                _ = shutdown.changed() => break,
            };

            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::warn!("Transport error on peer '{}': {}", peer_id, e);
                    break;
                }
                None => break,
            };

            let decoded = match msg {
                Message::Text(text) => codec::decode(text.as_str().as_bytes()),
                Message::Binary(data) => codec::decode(&data),
                Message::Close(_) => {
                    tracing::debug!("Peer '{}' requested close", peer_id);
                    break;
                }
                // Ping/pong は WebSocket 層で自動処理される
                _ => continue,
            };

            let envelope = match decoded {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::debug!("Dropping frame from peer '{}': {}", peer_id, e);
                    continue;
                }
            };

            if let Err(e) = sync_state.apply(envelope).await {
                tracing::error!("Failed to apply frame from peer '{}': {}", peer_id, e);
            }
        }
    });

    // Spawn a task to push queued frames to this peer
    let mut send_task = pusher_loop(peer_id, rx, sender);

    tokio::select! {
        _ = &mut recv_task => {
            let shutting_down = *state.shutdown.borrow();
            if shutting_down {
                // close_all でキューが閉じられ、送信タスクが Close フレームを送って終了する
                if tokio::time::timeout(PEER_WRITE_TIMEOUT, &mut send_task).await.is_err() {
                    send_task.abort();
                }
            } else {
                send_task.abort();
            }
        }
        _ = &mut send_task => {
            let _ = stop_recv_tx.send(());
            let _ = recv_task.await;
        }
    };

    match state.disconnect_peer_usecase.execute(&peer_id).await {
        Ok(_) => tracing::info!("Peer '{}' disconnected", peer_id),
        Err(e) => tracing::error!(
            "Failed to record disconnection of peer '{}': {}",
            peer_id,
            e
        ),
    }
}
