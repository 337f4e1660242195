//! Typed protocol envelopes and peer identity.

use std::fmt;

use uuid::Uuid;

/// Decoded inbound message from the game-server plugin.
///
/// Construction goes through the codec, which guarantees every required field
/// is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Server came up or went down, optionally with the current player count
    Status {
        online: bool,
        player_count: Option<u32>,
    },
    /// Player count changed
    Player { count: u32 },
    /// In-game chat line
    Chat { player: String, message: String },
}

/// Identifier of one live transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell peers apart in logs
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}
