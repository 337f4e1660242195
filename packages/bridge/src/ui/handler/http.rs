//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::{infrastructure::dto::http::ServerStateDto, ui::state::AppState};
use discraft_shared::time::to_rfc3339_millis;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current persisted server state and the number of live peers
pub async fn get_state(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ServerStateDto>, StatusCode> {
    let server_state = state.repository.get_server_state().await.map_err(|e| {
        tracing::error!("Failed to read server state: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    let live_connections = state.message_pusher.count().await;

    // Domain Model から DTO への変換
    Ok(Json(ServerStateDto {
        is_online: server_state.is_online,
        player_count: server_state.player_count,
        public_ip: server_state.public_ip,
        updated_at: to_rfc3339_millis(server_state.updated_at),
        live_connections,
    }))
}
