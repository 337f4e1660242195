//! WebSocket bridge between a game server plugin and the rest of the bot.
//!
//! The game-server plugin connects as a WebSocket peer and reports its
//! online status, player count and chat. The bridge persists that state,
//! notifies subscribers on every change and relays chat back to the plugin.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

mod bridge;

pub use bridge::Bridge;
