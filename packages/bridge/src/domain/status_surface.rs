//! Port for the external surface that renders the status artifact.

use async_trait::async_trait;

use super::{ServerState, SurfaceError};

/// Place where a status message is rendered (e.g. a chat channel).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSurface: Send + Sync {
    /// ID of this surface, stored alongside the artifact
    fn surface_id(&self) -> String;

    /// Re-render an existing artifact in place.
    ///
    /// Returns `Ok(false)` when the surface reports the artifact is gone.
    /// Refresh treats an `Err` the same way and renders a new artifact.
    async fn edit(&self, artifact_id: String, state: ServerState) -> Result<bool, SurfaceError>;

    /// Replace an existing artifact with the "bot stopped" view.
    ///
    /// Returns `Ok(false)` when the artifact is gone.
    async fn render_shutdown(&self, artifact_id: String) -> Result<bool, SurfaceError>;

    /// Render a new artifact and return its ID
    async fn create(&self, state: ServerState) -> Result<String, SurfaceError>;
}
