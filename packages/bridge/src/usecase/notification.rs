//! Subscriber notification ports.
//!
//! One "state changed" slot and one "chat received" slot. Registering again
//! replaces the previous callback.

use std::sync::{Arc, PoisonError, RwLock};

/// Called after every accepted state mutation; re-read state to see the change
pub type StateChangedCallback = Arc<dyn Fn() + Send + Sync>;

/// Called with `(player, message)` for every chat line from the game server
pub type ChatReceivedCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
pub struct NotificationPorts {
    state_changed: RwLock<Option<StateChangedCallback>>,
    chat_received: RwLock<Option<ChatReceivedCallback>>,
}

impl NotificationPorts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_state_changed<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self
            .state_changed
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    pub fn on_chat_received<F>(&self, callback: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        let mut slot = self
            .chat_received
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    /// Invoke the state-changed subscriber. Returns `false` when none is registered.
    pub fn notify_state_changed(&self) -> bool {
        // Clone out of the lock so the callback may re-register itself
        let callback = self
            .state_changed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Invoke the chat subscriber. Returns `false` when none is registered.
    pub fn notify_chat_received(&self, player: &str, message: &str) -> bool {
        let callback = self
            .chat_received
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback(player, message);
                true
            }
            None => false,
        }
    }
}
