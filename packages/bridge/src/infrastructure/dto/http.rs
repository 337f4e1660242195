//! HTTP API response DTOs.

use serde::Serialize;

/// Response body of `GET /api/state`
#[derive(Debug, Clone, Serialize)]
pub struct ServerStateDto {
    pub is_online: bool,
    pub player_count: u32,
    pub public_ip: Option<String>,
    /// RFC 3339 (UTC)
    pub updated_at: String,
    pub live_connections: usize,
}
