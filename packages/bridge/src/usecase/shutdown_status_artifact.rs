//! UseCase: 停止時のステータス表示
//!
//! キャッシュ済みの成果物を「停止中」の表示に書き換えます。
//! 成果物がない・削除済みの場合は何もしません（新しく作成もしない）。

use std::sync::Arc;

use crate::domain::{CachedStatusArtifact, ServerStateRepository, StatusSurface};

use super::RefreshError;

/// 停止時表示のユースケース
pub struct ShutdownStatusArtifactUseCase {
    repository: Arc<dyn ServerStateRepository>,
}

impl ShutdownStatusArtifactUseCase {
    pub fn new(repository: Arc<dyn ServerStateRepository>) -> Self {
        Self { repository }
    }

    /// Returns the artifact that now shows the shutdown view, if any
    pub async fn execute(
        &self,
        surface: &dyn StatusSurface,
    ) -> Result<Option<CachedStatusArtifact>, RefreshError> {
        let Some(cached) = self.repository.get_cached_status_artifact().await? else {
            tracing::debug!("No status artifact to mark as stopped");
            return Ok(None);
        };

        if surface.render_shutdown(cached.artifact_id.clone()).await? {
            tracing::info!("Status artifact '{}' marked as stopped", cached.artifact_id);
            Ok(Some(cached))
        } else {
            tracing::info!(
                "Status artifact '{}' is gone, nothing to mark as stopped",
                cached.artifact_id
            );
            Ok(None)
        }
    }
}
