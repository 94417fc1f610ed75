//! Configuration management for the flag-duel service
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values for the matchmaking service.

pub mod app;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, MatchmakingSettings, RoundSettings, ServiceSettings,
    StoreSettings,
};
