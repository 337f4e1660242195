//! ServerStateRepository の実装
//!
//! - `sqlite`: SQLite (sqlx) による永続化実装
//! - `inmemory`: プロセス内だけで状態を保持する実装（テスト・DB なし運用向け）

pub mod inmemory;
pub mod sqlite;

pub use inmemory::InMemoryServerStateRepository;
pub use sqlite::SqliteServerStateRepository;
