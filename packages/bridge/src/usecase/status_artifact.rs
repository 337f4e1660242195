//! UseCase: ステータス表示（成果物）の更新
//!
//! キャッシュ済みの成果物があればその場で編集し、なければ（または外部から
//! 削除されていれば）新しく作成して参照を保存します。
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 初回：キャッシュなし → 作成して保存
//! - 2 回目以降：編集のみ（保存しない）
//! - 外部で削除済み：作り直して参照を置き換える
//! - 編集に失敗：削除済みとみなして作り直す
//! - 異常系：作成時のサーフェスのエラーは呼び出し元に返す

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    CachedStatusArtifact, ServerStateRepository, StatusSurface, StoreError, SurfaceError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Existing artifact was re-rendered in place
    Edited(CachedStatusArtifact),
    /// A new artifact was rendered and its reference saved
    Created(CachedStatusArtifact),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// ステータス成果物更新のユースケース
pub struct RefreshStatusArtifactUseCase {
    repository: Arc<dyn ServerStateRepository>,
}

impl RefreshStatusArtifactUseCase {
    pub fn new(repository: Arc<dyn ServerStateRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        surface: &dyn StatusSurface,
    ) -> Result<RefreshOutcome, RefreshError> {
        let state = self.repository.get_server_state().await?;

        if let Some(cached) = self.repository.get_cached_status_artifact().await? {
            match surface.edit(cached.artifact_id.clone(), state.clone()).await {
                Ok(true) => return Ok(RefreshOutcome::Edited(cached)),
                Ok(false) => tracing::info!(
                    "Status artifact '{}' is gone, rendering a new one",
                    cached.artifact_id
                ),
                Err(e) => tracing::warn!(
                    "Failed to edit status artifact '{}', rendering a new one: {}",
                    cached.artifact_id,
                    e
                ),
            }
        }

        let artifact_id = surface.create(state).await?;
        let saved = self
            .repository
            .save_cached_status_artifact(artifact_id, surface.surface_id())
            .await?;
        Ok(RefreshOutcome::Created(saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MockStatusSurface, infrastructure::repository::InMemoryServerStateRepository,
    };
    use discraft_shared::time::SystemClock;
    use mockall::predicate::eq;

    fn create_test_repository() -> Arc<InMemoryServerStateRepository> {
        Arc::new(InMemoryServerStateRepository::new(Arc::new(SystemClock)))
    }

    #[tokio::test]
    async fn test_first_refresh_creates_and_saves() {
        // テスト項目: キャッシュがない場合は作成して参照を保存する
        // given (前提条件):
        let repository = create_test_repository();
        let mut surface = MockStatusSurface::new();
        surface.expect_edit().never();
        surface
            .expect_create()
            .times(1)
            .returning(|_| Ok("msg-1".to_string()));
        surface
            .expect_surface_id()
            .return_const("chan-1".to_string());
        let usecase = RefreshStatusArtifactUseCase::new(repository.clone());

        // when (操作):
        let outcome = usecase.execute(&surface).await.unwrap();

        // then (期待する結果):
        let RefreshOutcome::Created(artifact) = outcome else {
            panic!("first refresh should create");
        };
        assert_eq!(artifact.artifact_id, "msg-1");
        assert_eq!(artifact.surface_id, "chan-1");
        assert_eq!(
            repository.get_cached_status_artifact().await.unwrap(),
            Some(artifact)
        );
    }

    #[tokio::test]
    async fn test_refresh_edits_existing_artifact_in_place() {
        // テスト項目: キャッシュがあり編集できた場合は作成も保存もしない
        // given (前提条件):
        let repository = create_test_repository();
        let saved = repository
            .save_cached_status_artifact("msg-1".to_string(), "chan-1".to_string())
            .await
            .unwrap();
        let mut surface = MockStatusSurface::new();
        surface
            .expect_edit()
            .withf(|artifact_id, _| artifact_id == "msg-1")
            .times(1)
            .returning(|_, _| Ok(true));
        surface.expect_create().never();
        let usecase = RefreshStatusArtifactUseCase::new(repository.clone());

        // when (操作):
        let outcome = usecase.execute(&surface).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RefreshOutcome::Edited(saved.clone()));
        assert_eq!(
            repository.get_cached_status_artifact().await.unwrap(),
            Some(saved)
        );
    }

    #[tokio::test]
    async fn test_refresh_replaces_vanished_artifact() {
        // テスト項目: 外部で削除された成果物は作り直され、参照が置き換わる
        // given (前提条件):
        let repository = create_test_repository();
        repository
            .save_cached_status_artifact("msg-1".to_string(), "chan-1".to_string())
            .await
            .unwrap();
        let mut surface = MockStatusSurface::new();
        surface
            .expect_edit()
            .with(eq("msg-1".to_string()), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(false));
        surface
            .expect_create()
            .times(1)
            .returning(|_| Ok("msg-2".to_string()));
        surface
            .expect_surface_id()
            .return_const("chan-1".to_string());
        let usecase = RefreshStatusArtifactUseCase::new(repository.clone());

        // when (操作):
        let outcome = usecase.execute(&surface).await.unwrap();

        // then (期待する結果):
        let RefreshOutcome::Created(artifact) = outcome else {
            panic!("vanished artifact should be recreated");
        };
        assert_eq!(artifact.artifact_id, "msg-2");
        let stored = repository.get_cached_status_artifact().await.unwrap();
        assert_eq!(stored.map(|a| a.artifact_id), Some("msg-2".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_recreates_when_edit_fails() {
        // テスト項目: 編集に失敗した成果物は削除済みとみなされ、作り直される
        // given (前提条件):
        let repository = create_test_repository();
        repository
            .save_cached_status_artifact("msg-1".to_string(), "chan-1".to_string())
            .await
            .unwrap();
        let mut surface = MockStatusSurface::new();
        surface
            .expect_edit()
            .times(1)
            .returning(|_, _| Err(SurfaceError("unknown message".to_string())));
        surface
            .expect_create()
            .times(1)
            .returning(|_| Ok("msg-2".to_string()));
        surface
            .expect_surface_id()
            .return_const("chan-1".to_string());
        let usecase = RefreshStatusArtifactUseCase::new(repository.clone());

        // when (操作):
        let outcome = usecase.execute(&surface).await.unwrap();

        // then (期待する結果):
        let RefreshOutcome::Created(artifact) = outcome else {
            panic!("failed edit should fall back to create");
        };
        assert_eq!(artifact.artifact_id, "msg-2");
        let stored = repository.get_cached_status_artifact().await.unwrap();
        assert_eq!(stored.map(|a| a.artifact_id), Some("msg-2".to_string()));
    }

    #[tokio::test]
    async fn test_surface_error_is_returned() {
        // テスト項目: サーフェスのエラーは RefreshError::Surface として返る
        // given (前提条件):
        let repository = create_test_repository();
        let mut surface = MockStatusSurface::new();
        surface
            .expect_create()
            .returning(|_| Err(SurfaceError("missing permissions".to_string())));
        let usecase = RefreshStatusArtifactUseCase::new(repository.clone());

        // when (操作):
        let result = usecase.execute(&surface).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RefreshError::Surface(SurfaceError(
                "missing permissions".to_string()
            )))
        );
        assert_eq!(repository.get_cached_status_artifact().await.unwrap(), None);
    }
}
