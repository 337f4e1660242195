//! Data Transfer Objects (DTOs)
//!
//! 外部とのデータ交換に使用する型を定義します。
//!
//! - `websocket`: プラグインとの WebSocket メッセージの型
//! - `http`: HTTP API のレスポンス型
//! - `conversion`: DTO からドメインモデルへの変換

pub mod conversion;
pub mod http;
pub mod websocket;
