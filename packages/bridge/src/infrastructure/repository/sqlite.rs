//! SQLite ServerState Repository 実装
//!
//! `server_state` と `status_artifact` はどちらも `id = 1` の 1 行だけを持つテーブルです。
//! 更新は「UPDATE → SELECT」を 1 トランザクションで行い、書き込み直後の行を返します。

use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use discraft_shared::time::Clock;
use sqlx::{
    Executor, FromRow, Sqlite, SqlitePool,
    query::Query,
    sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

use crate::domain::{CachedStatusArtifact, ServerState, ServerStateRepository, StoreError};

const SCHEMA: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 4;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, FromRow)]
struct ServerStateRow {
    is_online: bool,
    player_count: i64,
    public_ip: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ServerStateRow> for ServerState {
    type Error = StoreError;

    fn try_from(row: ServerStateRow) -> Result<Self, Self::Error> {
        let player_count = u32::try_from(row.player_count)
            .map_err(|_| StoreError::Corrupt(format!("player_count = {}", row.player_count)))?;
        Ok(ServerState {
            is_online: row.is_online,
            player_count,
            public_ip: row.public_ip,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StatusArtifactRow {
    artifact_id: String,
    surface_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StatusArtifactRow> for CachedStatusArtifact {
    fn from(row: StatusArtifactRow) -> Self {
        CachedStatusArtifact {
            artifact_id: row.artifact_id,
            surface_id: row.surface_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLite による ServerStateRepository 実装
pub struct SqliteServerStateRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteServerStateRepository {
    /// データベースを開き（なければ作成し）、スキーマとシングルトン行を初期化する
    ///
    /// # Arguments
    ///
    /// * `database_url` - e.g. `sqlite://data/bot.db`
    /// * `clock` - `updated_at` / `created_at` の打刻に使う時計
    pub async fn connect(database_url: &str, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Unavailable(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        tracing::info!("Using database at {}", database_url);

        Self::init(pool, clock).await
    }

    /// プロセス内だけの SQLite データベースで作成
    ///
    /// 接続ごとに別のデータベースになるため、接続は 1 本に固定して使い回す。
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::init(pool, clock).await
    }

    /// Idempotent: safe against an already initialized database.
    async fn init(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO server_state (id, is_online, player_count, public_ip, updated_at)
             VALUES (1, 0, 0, NULL, ?1)",
        )
        .bind(clock.now())
        .execute(&pool)
        .await?;

        Ok(Self { pool, clock })
    }

    async fn fetch_server_state<'e, E>(executor: E) -> Result<ServerState, StoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row: Option<ServerStateRow> = sqlx::query_as(
            "SELECT is_online, player_count, public_ip, updated_at FROM server_state WHERE id = 1",
        )
        .fetch_optional(executor)
        .await?;

        row.ok_or(StoreError::MissingRow("server_state"))?
            .try_into()
    }

    /// Run one `UPDATE server_state ...` and read the row back in the same transaction
    async fn update_and_fetch<'q>(
        &self,
        update: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<ServerState, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = update.execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRow("server_state"));
        }
        let state = Self::fetch_server_state(&mut *tx).await?;

        tx.commit().await?;
        Ok(state)
    }
}

#[async_trait]
impl ServerStateRepository for SqliteServerStateRepository {
    async fn get_server_state(&self) -> Result<ServerState, StoreError> {
        Self::fetch_server_state(&self.pool).await
    }

    async fn update_server_state(
        &self,
        is_online: bool,
        player_count: Option<u32>,
        public_ip: Option<String>,
    ) -> Result<ServerState, StoreError> {
        let update = sqlx::query(
            "UPDATE server_state SET
                is_online = ?1,
                player_count = COALESCE(?2, player_count),
                public_ip = COALESCE(?3, public_ip),
                updated_at = ?4
             WHERE id = 1",
        )
        .bind(is_online)
        .bind(player_count.map(i64::from))
        .bind(public_ip)
        .bind(self.clock.now());

        self.update_and_fetch(update).await
    }

    async fn update_player_count(&self, count: u32) -> Result<ServerState, StoreError> {
        let update =
            sqlx::query("UPDATE server_state SET player_count = ?1, updated_at = ?2 WHERE id = 1")
                .bind(i64::from(count))
                .bind(self.clock.now());

        self.update_and_fetch(update).await
    }

    async fn update_public_ip(&self, ip: String) -> Result<ServerState, StoreError> {
        let update =
            sqlx::query("UPDATE server_state SET public_ip = ?1, updated_at = ?2 WHERE id = 1")
                .bind(ip)
                .bind(self.clock.now());

        self.update_and_fetch(update).await
    }

    async fn get_cached_status_artifact(
        &self,
    ) -> Result<Option<CachedStatusArtifact>, StoreError> {
        let row: Option<StatusArtifactRow> = sqlx::query_as(
            "SELECT artifact_id, surface_id, created_at, updated_at FROM status_artifact WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CachedStatusArtifact::from))
    }

    async fn save_cached_status_artifact(
        &self,
        artifact_id: String,
        surface_id: String,
    ) -> Result<CachedStatusArtifact, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO status_artifact (id, artifact_id, surface_id, created_at, updated_at)
             VALUES (1, ?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                artifact_id = excluded.artifact_id,
                surface_id = excluded.surface_id,
                updated_at = excluded.updated_at",
        )
        .bind(artifact_id)
        .bind(surface_id)
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await?;

        let row: StatusArtifactRow = sqlx::query_as(
            "SELECT artifact_id, surface_id, created_at, updated_at FROM status_artifact WHERE id = 1",
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
