// Core modules
pub mod analysis;
pub mod api;
pub mod bot;
pub mod config;
pub mod decision;
pub mod error;
pub mod gate;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod signal;

// Re-export commonly used types
pub use config::{BotConfig, RuntimeSettings};
pub use error::{BotError, Result};
pub use models::*;
