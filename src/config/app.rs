//! Main application configuration
//!
//! This module defines the primary configuration structures for the flag-duel
//! matchmaking service, including environment variable and TOML loading and
//! validation.

use crate::types::StatusMode;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub round: RoundSettings,
    pub store: StoreSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP API binds to
    pub http_host: String,
    /// Port for the HTTP API (game, health and metrics endpoints)
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Game client version reported by the update endpoint
    pub game_version: String,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// How status polls decide a player has been paired
    pub status_mode: StatusMode,
    /// Let the server hand out player ids when a join omits one
    pub assign_player_ids: bool,
}

/// Round content settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundSettings {
    /// Number of distinct tokens per round
    pub token_count: usize,
    /// Batches drawn before generation gives up
    pub max_generation_attempts: u32,
    /// Optional `;`-separated vocabulary file; the built-in list is used otherwise
    pub vocabulary_path: Option<PathBuf>,
}

/// Match record store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON snapshot file; records are kept in memory only when unset
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "flag-duel".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 5000,
            shutdown_timeout_seconds: 30,
            game_version: "0.2".to_string(),
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            status_mode: StatusMode::OwnRecord,
            assign_player_ids: false,
        }
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            token_count: 20,
            max_generation_attempts: 1000,
            vocabulary_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| anyhow!("Invalid configuration file: {}", e))
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(version) = env::var("GAME_VERSION") {
            self.service.game_version = version;
        }

        // Matchmaking settings
        if let Ok(mode) = env::var("STATUS_MODE") {
            self.matchmaking.status_mode = mode
                .parse()
                .map_err(|e| anyhow!("Invalid STATUS_MODE value: {}", e))?;
        }
        if let Ok(assign) = env::var("ASSIGN_PLAYER_IDS") {
            self.matchmaking.assign_player_ids = assign
                .parse()
                .map_err(|_| anyhow!("Invalid ASSIGN_PLAYER_IDS value: {}", assign))?;
        }

        // Round settings
        if let Ok(count) = env::var("ROUND_TOKEN_COUNT") {
            self.round.token_count = count
                .parse()
                .map_err(|_| anyhow!("Invalid ROUND_TOKEN_COUNT value: {}", count))?;
        }
        if let Ok(attempts) = env::var("ROUND_MAX_ATTEMPTS") {
            self.round.max_generation_attempts = attempts
                .parse()
                .map_err(|_| anyhow!("Invalid ROUND_MAX_ATTEMPTS value: {}", attempts))?;
        }
        if let Ok(path) = env::var("VOCABULARY_PATH") {
            self.round.vocabulary_path = Some(PathBuf::from(path));
        }

        // Store settings
        if let Ok(path) = env::var("STORE_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Address the HTTP server binds to
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.http_host.is_empty() {
        return Err(anyhow!("HTTP host cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate round settings
    if config.round.token_count == 0 {
        return Err(anyhow!("Round token count must be greater than 0"));
    }
    if config.round.max_generation_attempts == 0 {
        return Err(anyhow!("Round generation attempts must be greater than 0"));
    }

    Ok(())
}
