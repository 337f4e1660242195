//! Persisted state store trait.
//!
//! The concrete implementations live in the infrastructure layer
//! (`infrastructure::repository`).

use async_trait::async_trait;

use super::{CachedStatusArtifact, ServerState, StoreError};

/// Store for the singleton server state row and the cached status artifact.
///
/// Implementations must guarantee the singleton rows exist once construction
/// succeeds, serialize writers, and return the row as observed right after the
/// write (update-then-read in one transaction).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerStateRepository: Send + Sync {
    /// Current snapshot
    async fn get_server_state(&self) -> Result<ServerState, StoreError>;

    /// Partial update; `None` keeps the stored value. Always stamps `updated_at`.
    async fn update_server_state(
        &self,
        is_online: bool,
        player_count: Option<u32>,
        public_ip: Option<String>,
    ) -> Result<ServerState, StoreError>;

    async fn update_player_count(&self, count: u32) -> Result<ServerState, StoreError>;

    async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError>;

    async fn get_cached_status_artifact(&self)
    -> Result<Option<CachedStatusArtifact>, StoreError>;

    /// Upsert: creates the reference if absent, otherwise overwrites both ids
    async fn save_cached_status_artifact(
        &self,
        artifact_id: String,
        surface_id: String,
    ) -> Result<CachedStatusArtifact, StoreError>;

    /// Release underlying resources
    async fn close(&self) {}
}
