//! Canonical server state and the cached status artifact reference.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Placeholder shown when no address is known
pub const UNKNOWN_IP: &str = "unknown";

/// Canonical snapshot of the bridged game server.
///
/// Exactly one instance exists in the store; it is created with
/// [`ServerState::initial`] and only ever updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerState {
    pub is_online: bool,
    pub player_count: u32,
    pub public_ip: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ServerState {
    /// Default row written at store initialization
    pub fn initial(updated_at: DateTime<Utc>) -> Self {
        Self {
            is_online: false,
            player_count: 0,
            public_ip: None,
            updated_at,
        }
    }

    /// Address to show to users.
    ///
    /// A statically configured address takes precedence over the resolved one.
    pub fn display_ip<'a>(&'a self, static_ip: Option<&'a str>) -> &'a str {
        static_ip
            .filter(|ip| !ip.is_empty())
            .or(self.public_ip.as_deref())
            .unwrap_or(UNKNOWN_IP)
    }
}

/// Reference to an externally rendered status message that is edited in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedStatusArtifact {
    /// ID of the rendered object on the external surface (e.g. a message ID)
    pub artifact_id: String,
    /// ID of the surface the object lives on (e.g. a channel ID)
    pub surface_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
