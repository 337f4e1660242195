//! UseCase 層
//!
//! 接続ライフサイクル・受信メッセージの反映・チャット中継など、
//! ブリッジのアプリケーションロジックを提供します。

mod connect_peer;
mod disconnect_peer;
mod notification;
mod relay_message;
mod shutdown_status_artifact;
mod status_artifact;
mod sync_state;

pub use connect_peer::ConnectPeerUseCase;
pub use disconnect_peer::DisconnectPeerUseCase;
pub use notification::{ChatReceivedCallback, NotificationPorts, StateChangedCallback};
pub use relay_message::RelayMessageUseCase;
pub use shutdown_status_artifact::ShutdownStatusArtifactUseCase;
pub use status_artifact::{RefreshError, RefreshOutcome, RefreshStatusArtifactUseCase};
pub use sync_state::{SyncOutcome, SyncStateUseCase};
