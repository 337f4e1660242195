//! Error types for the bridge.
//!
//! Bind and store failures propagate to the owning process. Decode and
//! single-peer write failures are contained by the connection manager and
//! only logged.

use std::io;

use thiserror::Error;

use super::PeerId;

/// Listener could not be started
#[derive(Debug, Error)]
#[error("failed to bind websocket listener on {addr}: {source}")]
pub struct BindError {
    pub addr: String,
    #[source]
    pub source: io::Error,
}

/// Inbound frame could not be turned into an [`Envelope`](super::Envelope)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("frame has no 'type' field")]
    MissingType,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("'{kind}' message is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

/// Outbound payload could not be serialized into a flat frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("payload for '{0}' must serialize to a JSON object")]
    NotAnObject(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(String),
}

/// A single peer did not accept a broadcast frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerWriteError {
    #[error("peer {0} has a full send queue, frame dropped")]
    QueueFull(PeerId),

    #[error("peer {0} is disconnected")]
    Disconnected(PeerId),
}

/// Persistence layer failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("singleton row in '{0}' is missing")]
    MissingRow(&'static str),

    #[error("corrupt value in store: {0}")]
    Corrupt(String),
}

/// External status surface failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status surface error: {0}")]
pub struct SurfaceError(pub String);

/// Result of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Number of peers the frame was queued for
    pub delivered: usize,
    /// Peers that were skipped
    pub failed: Vec<PeerWriteError>,
}

impl BroadcastReport {
    pub fn is_noop(&self) -> bool {
        self.delivered == 0 && self.failed.is_empty()
    }
}
