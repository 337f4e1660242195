//! InMemory ServerState Repository 実装
//!
//! ドメイン層が定義する ServerStateRepository trait の具体的な実装。
//! シングルトン行を `Mutex` で保護して保持します。プロセス終了で状態は失われます。

use std::sync::Arc;

use async_trait::async_trait;
use discraft_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{CachedStatusArtifact, ServerState, ServerStateRepository, StoreError};

struct Tables {
    server_state: ServerState,
    status_artifact: Option<CachedStatusArtifact>,
}

/// インメモリ ServerState Repository 実装
pub struct InMemoryServerStateRepository {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
}

impl InMemoryServerStateRepository {
    /// 初期状態（オフライン・0 人）で作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let tables = Tables {
            server_state: ServerState::initial(clock.now()),
            status_artifact: None,
        };
        Self {
            tables: Mutex::new(tables),
            clock,
        }
    }
}

#[async_trait]
impl ServerStateRepository for InMemoryServerStateRepository {
    async fn get_server_state(&self) -> Result<ServerState, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.server_state.clone())
    }

    async fn update_server_state(
        &self,
        is_online: bool,
        player_count: Option<u32>,
        public_ip: Option<String>,
    ) -> Result<ServerState, StoreError> {
        let mut tables = self.tables.lock().await;
        let state = &mut tables.server_state;
        state.is_online = is_online;
        if let Some(count) = player_count {
            state.player_count = count;
        }
        if let Some(ip) = public_ip {
            state.public_ip = Some(ip);
        }
        state.updated_at = self.clock.now();
        Ok(state.clone())
    }

    async fn update_player_count(&self, count: u32) -> Result<ServerState, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.server_state.player_count = count;
        tables.server_state.updated_at = self.clock.now();
        Ok(tables.server_state.clone())
    }

    async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.server_state.public_ip = Some(ip);
        tables.server_state.updated_at = self.clock.now();
        Ok(tables.server_state.clone())
    }

    async fn get_cached_status_artifact(
        &self,
    ) -> Result<Option<CachedStatusArtifact>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.status_artifact.clone())
    }

    async fn save_cached_status_artifact(
        &self,
        artifact_id: String,
        surface_id: String,
    ) -> Result<CachedStatusArtifact, StoreError> {
        let now = self.clock.now();
        let mut tables = self.tables.lock().await;
        let artifact = match tables.status_artifact.take() {
            Some(existing) => CachedStatusArtifact {
                artifact_id,
                surface_id,
                updated_at: now,
                ..existing
            },
            None => CachedStatusArtifact {
                artifact_id,
                surface_id,
                created_at: now,
                updated_at: now,
            },
        };
        tables.status_artifact = Some(artifact.clone());
        Ok(artifact)
    }
}
