//! End-to-end tests: a real listener on an ephemeral port, peers connected
//! with tokio-tungstenite and an in-memory store.
//!
//! ========================================
//! テスト作業記録
//! ========================================
//! 【何をテストするか】
//! - 接続 → status / player / chat → 切断の一連の流れ
//! - 不正なフレームが無視されること
//! - send_chat が接続中の全ピアに届くこと
//! - stop の冪等性、ポート競合時の BindError
//! - HTTP エンドポイント
//! ========================================

use std::{
    net::SocketAddr,
    sync::{
        Arc, Weak,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use discraft_bridge::{
    Bridge,
    domain::{CachedStatusArtifact, ServerState, ServerStateRepository, StoreError},
    infrastructure::repository::InMemoryServerStateRepository,
};
use discraft_shared::time::FixedClock;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{
    net::TcpStream,
    sync::mpsc::{UnboundedReceiver, error::TryRecvError, unbounded_channel},
    time::timeout,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Peer = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    bridge: Arc<Bridge>,
    addr: SocketAddr,
    states: UnboundedReceiver<ServerState>,
    chats: UnboundedReceiver<(String, String)>,
}

impl Harness {
    async fn start() -> Self {
        let repository: Arc<dyn ServerStateRepository> = Arc::new(
            InMemoryServerStateRepository::new(Arc::new(FixedClock::from_millis(1_700_000_000_000))),
        );
        let bridge = Arc::new(Bridge::new(repository).await.unwrap());

        let (state_tx, states) = unbounded_channel();
        let weak: Weak<Bridge> = Arc::downgrade(&bridge);
        bridge.on_state_changed(move || {
            if let Some(bridge) = weak.upgrade() {
                let _ = state_tx.send(bridge.snapshot());
            }
        });

        let (chat_tx, chats) = unbounded_channel();
        bridge.on_chat_received(move |player, message| {
            let _ = chat_tx.send((player.to_string(), message.to_string()));
        });

        let addr = bridge.start("127.0.0.1", 0).await.unwrap();

        Self {
            bridge,
            addr,
            states,
            chats,
        }
    }

    async fn connect(&self, path: &str) -> Peer {
        let url = format!("ws://{}{}", self.addr, path);
        let (peer, _) = timeout(WAIT, connect_async(url)).await.unwrap().unwrap();
        peer
    }

    async fn next_state(&mut self) -> ServerState {
        timeout(WAIT, self.states.recv())
            .await
            .expect("timed out waiting for state change")
            .expect("state channel closed")
    }

    async fn next_chat(&mut self) -> (String, String) {
        timeout(WAIT, self.chats.recv())
            .await
            .expect("timed out waiting for chat")
            .expect("chat channel closed")
    }
}

async fn send(peer: &mut Peer, frame: &str) {
    peer.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

async fn next_json(peer: &mut Peer) -> Value {
    loop {
        let msg = timeout(WAIT, peer.next())
            .await
            .expect("timed out waiting for frame")
            .expect("peer stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Store that counts completed state writes
struct CountingRepository {
    inner: InMemoryServerStateRepository,
    writes: AtomicUsize,
}

impl CountingRepository {
    fn counted(&self, state: ServerState) -> ServerState {
        self.writes.fetch_add(1, Ordering::SeqCst);
        state
    }
}

#[async_trait]
impl ServerStateRepository for CountingRepository {
    async fn get_server_state(&self) -> Result<ServerState, StoreError> {
        self.inner.get_server_state().await
    }

    async fn update_server_state(
        &self,
        is_online: bool,
        player_count: Option<u32>,
        public_ip: Option<String>,
    ) -> Result<ServerState, StoreError> {
        let state = self
            .inner
            .update_server_state(is_online, player_count, public_ip)
            .await?;
        Ok(self.counted(state))
    }

    async fn update_player_count(&self, count: u32) -> Result<ServerState, StoreError> {
        let state = self.inner.update_player_count(count).await?;
        Ok(self.counted(state))
    }

    async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError> {
        let state = self.inner.update_public_ip(ip).await?;
        Ok(self.counted(state))
    }

    async fn get_cached_status_artifact(
        &self,
    ) -> Result<Option<CachedStatusArtifact>, StoreError> {
        self.inner.get_cached_status_artifact().await
    }

    async fn save_cached_status_artifact(
        &self,
        artifact_id: String,
        surface_id: String,
    ) -> Result<CachedStatusArtifact, StoreError> {
        self.inner
            .save_cached_status_artifact(artifact_id, surface_id)
            .await
    }
}

/// Reads until the bridge closes the connection
async fn wait_closed(peer: &mut Peer) {
    timeout(WAIT, async {
        while let Some(msg) = peer.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await
    .expect("peer was not closed");
}

#[tokio::test]
async fn test_status_player_chat_and_disconnect() {
    // テスト項目: 接続 → status → player → chat → 切断が順に反映される
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut peer = harness.connect("/ws").await;

    let connected = harness.next_state().await;
    assert!(connected.is_online);
    assert_eq!(connected.player_count, 0);

    // when (操作):
    send(&mut peer, r#"{"type":"status","online":true,"playerCount":3}"#).await;
    let status = harness.next_state().await;

    send(&mut peer, r#"{"type":"player","count":5}"#).await;
    let player = harness.next_state().await;

    send(&mut peer, r#"{"type":"chat","player":"Steve","message":"hello"}"#).await;
    let chat = harness.next_chat().await;

    peer.close(None).await.unwrap();
    let disconnected = harness.next_state().await;

    // then (期待する結果):
    assert!(status.is_online);
    assert_eq!(status.player_count, 3);
    assert!(player.is_online);
    assert_eq!(player.player_count, 5);
    assert_eq!(chat, ("Steve".to_string(), "hello".to_string()));
    assert!(!disconnected.is_online);
    assert_eq!(disconnected.player_count, 0);

    let stored = harness.bridge.server_state().await.unwrap();
    assert_eq!(stored, disconnected);
    assert_eq!(harness.bridge.live_connection_count().await, 0);

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_status_without_player_count_keeps_count() {
    // テスト項目: playerCount のない status は人数を変更しない
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut peer = harness.connect("/").await;
    harness.next_state().await;
    send(&mut peer, r#"{"type":"player","count":4}"#).await;
    harness.next_state().await;

    // when (操作):
    send(&mut peer, r#"{"type":"status","online":false}"#).await;
    let state = harness.next_state().await;

    // then (期待する結果):
    assert!(!state.is_online);
    assert_eq!(state.player_count, 4);

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    // テスト項目: 不正なフレームは通知を発火させず、後続の正しいフレームは処理される
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut peer = harness.connect("/ws").await;
    harness.next_state().await;

    // when (操作):
    for frame in [
        "not json",
        "[1,2,3]",
        r#"{"online":true}"#,
        r#"{"type":"unknown"}"#,
        r#"{"type":"status"}"#,
        r#"{"type":"player"}"#,
        r#"{"type":"player","count":-1}"#,
        r#"{"type":"chat","player":"Steve"}"#,
        r#"{"type":"chat","player":"","message":"hi"}"#,
    ] {
        send(&mut peer, frame).await;
    }
    peer.send(Message::Binary(vec![0xff, 0xfe].into()))
        .await
        .unwrap();
    send(&mut peer, r#"{"type":"player","count":2}"#).await;

    // then (期待する結果):
    let state = harness.next_state().await;
    assert_eq!(state.player_count, 2);
    assert!(matches!(harness.chats.try_recv(), Err(TryRecvError::Empty)));
    assert!(matches!(harness.states.try_recv(), Err(TryRecvError::Empty)));

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_binary_frames_are_decoded() {
    // テスト項目: UTF-8 のバイナリフレームもテキストと同様に処理される
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut peer = harness.connect("/ws").await;
    harness.next_state().await;

    // when (操作):
    peer.send(Message::Binary(
        br#"{"type":"player","count":7}"#.to_vec().into(),
    ))
    .await
    .unwrap();

    // then (期待する結果):
    assert_eq!(harness.next_state().await.player_count, 7);

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_send_chat_reaches_live_peers_only() {
    // テスト項目: send_chat は接続中の全ピアに届き、切断済みのピアには送られない
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut first = harness.connect("/ws").await;
    harness.next_state().await;
    let mut second = harness.connect("/ws").await;
    harness.next_state().await;
    let mut gone = harness.connect("/ws").await;
    harness.next_state().await;
    gone.close(None).await.unwrap();
    harness.next_state().await;
    assert_eq!(harness.bridge.live_connection_count().await, 2);

    // when (操作):
    let report = harness.bridge.send_chat("alice", "hi there").await.unwrap();

    // then (期待する結果):
    assert_eq!(report.delivered, 2);
    assert!(report.failed.is_empty());
    let expected = json!({"type": "chat", "sender": "alice", "message": "hi there"});
    assert_eq!(next_json(&mut first).await, expected);
    assert_eq!(next_json(&mut second).await, expected);

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_broadcast_without_peers_is_noop() {
    // テスト項目: ピアがいない場合のブロードキャストは何もせず、エラーにもならない
    // given (前提条件):
    let harness = Harness::start().await;

    // when (操作):
    let report = harness
        .bridge
        .broadcast("status", &json!({"online": true}))
        .await
        .unwrap();

    // then (期待する結果):
    assert!(report.is_noop());

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_broadcast_rejects_non_object_payload() {
    // テスト項目: オブジェクトにならないペイロードは EncodeError になる
    // given (前提条件):
    let harness = Harness::start().await;

    // when (操作):
    let result = harness.bridge.broadcast("chat", &42).await;

    // then (期待する結果):
    assert!(result.is_err());

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_stop_closes_peers_and_is_idempotent() {
    // テスト項目: stop で全ピアが閉じられオフラインになり、2 回目の stop も安全
    // given (前提条件):
    let mut harness = Harness::start().await;
    let mut peer = harness.connect("/ws").await;
    harness.next_state().await;

    // when (操作):
    harness.bridge.stop().await;
    harness.bridge.stop().await;

    // then (期待する結果):
    wait_closed(&mut peer).await;
    let state = harness.next_state().await;
    assert!(!state.is_online);
    assert_eq!(state.player_count, 0);
    assert_eq!(harness.bridge.live_connection_count().await, 0);
    assert!(TcpStream::connect(harness.addr).await.is_err());
}

#[tokio::test]
async fn test_start_twice_returns_running_address() {
    // テスト項目: 起動中に start を呼ぶと現在のアドレスが返される
    // given (前提条件):
    let harness = Harness::start().await;

    // when (操作):
    let again = harness.bridge.start("127.0.0.1", 0).await.unwrap();

    // then (期待する結果):
    assert_eq!(again, harness.addr);

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_start_on_taken_port_fails() {
    // テスト項目: 使用中のポートでは BindError が返される
    // given (前提条件):
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let repository: Arc<dyn ServerStateRepository> = Arc::new(
        InMemoryServerStateRepository::new(Arc::new(FixedClock::from_millis(0))),
    );
    let bridge = Bridge::new(repository).await.unwrap();

    // when (操作):
    let result = bridge.start("127.0.0.1", port).await;

    // then (期待する結果):
    let err = result.unwrap_err();
    assert_eq!(err.addr, format!("127.0.0.1:{}", port));
}

#[tokio::test]
async fn test_http_endpoints() {
    // テスト項目: /api/health と /api/state が現在の状態を返す
    // given (前提条件):
    let mut harness = Harness::start().await;
    let _peer = harness.connect("/ws").await;
    harness.next_state().await;
    let client = reqwest::Client::new();

    // when (操作):
    let health: Value = client
        .get(format!("http://{}/api/health", harness.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let state: Value = client
        .get(format!("http://{}/api/state", harness.addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(state["is_online"], json!(true));
    assert_eq!(state["player_count"], json!(0));
    assert_eq!(state["live_connections"], json!(1));
    assert_eq!(state["updated_at"], json!("2023-11-14T22:13:20.000Z"));

    harness.bridge.stop().await;
}

#[tokio::test]
async fn test_stop_mid_stream_notifies_every_store_write() {
    // テスト項目: フレーム処理中に stop しても、ストアへの書き込みごとに通知が 1 回ずつ発火する
    // given (前提条件):
    let repository = Arc::new(CountingRepository {
        inner: InMemoryServerStateRepository::new(Arc::new(FixedClock::from_millis(0))),
        writes: AtomicUsize::new(0),
    });
    let bridge = Bridge::new(repository.clone()).await.unwrap();
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = notifications.clone();
    bridge.on_state_changed(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let addr = bridge.start("127.0.0.1", 0).await.unwrap();
    let (mut peer, _) = timeout(WAIT, connect_async(format!("ws://{}/ws", addr)))
        .await
        .unwrap()
        .unwrap();
    timeout(WAIT, async {
        while notifications.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peer connection was not recorded");
    for count in 1..=50u32 {
        send(&mut peer, &format!(r#"{{"type":"player","count":{}}}"#, count)).await;
    }

    // when (操作):
    bridge.stop().await;

    // then (期待する結果): 接続・切断を含め、書き込み回数と通知回数が一致する
    let writes = repository.writes.load(Ordering::SeqCst);
    assert!(writes >= 2);
    assert_eq!(notifications.load(Ordering::SeqCst), writes);
    assert_eq!(bridge.snapshot(), bridge.server_state().await.unwrap());
}
