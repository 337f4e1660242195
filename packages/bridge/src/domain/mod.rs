//! Domain layer: canonical server state, protocol envelopes, errors and the
//! ports (traits) implemented by the infrastructure layer.

mod envelope;
mod error;
mod message_pusher;
mod repository;
mod server_state;
mod status_surface;

pub use envelope::{Envelope, PeerId};
pub use error::{
    BindError, BroadcastReport, DecodeError, EncodeError, PeerWriteError, StoreError,
    SurfaceError,
};
pub use message_pusher::{MessagePusher, PeerChannel};
pub use repository::ServerStateRepository;
pub use server_state::{CachedStatusArtifact, ServerState, UNKNOWN_IP};
pub use status_surface::StatusSurface;

#[cfg(test)]
pub use repository::MockServerStateRepository;
#[cfg(test)]
pub use status_surface::MockStatusSurface;
