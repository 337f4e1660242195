//! Shared utilities for the discraft workspace (logging and time).

pub mod logger;
pub mod time;
