//! Configuration for RetroPulse
//!
//! Centralized configuration for server parameters, per-user quotas, and
//! board defaults.

use serde::{Deserialize, Serialize};

/// System-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetroConfig {
    /// Server settings
    pub server: ServerConfig,
    /// Per-user quota limits
    pub quotas: QuotaConfig,
    /// Board defaults
    pub boards: BoardConfig,
}

impl Default for RetroConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            quotas: QuotaConfig::default(),
            boards: BoardConfig::default(),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "127.0.0.1:8080"
    pub addr: String,
    /// WebSocket ping interval in seconds
    pub heartbeat_seconds: u32,
    /// Mark a participant idle after this many seconds without activity
    pub idle_after_seconds: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            heartbeat_seconds: 30,
            idle_after_seconds: 300,
        }
    }
}

/// Per-user quota limits; None means unlimited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum cards a user may have on one board
    pub max_cards_per_user: Option<u32>,
    /// Maximum reactions a user may place on one board
    pub max_reactions_per_user: Option<u32>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_cards_per_user: Some(20),
            max_reactions_per_user: Some(30),
        }
    }
}

/// Board defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Maximum columns a board may have
    pub max_columns: u32,
    /// Column names used when a board is created without any
    pub default_columns: Vec<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            max_columns: 8,
            default_columns: vec![
                "Went well".to_string(),
                "Needs improvement".to_string(),
                "Actions".to_string(),
            ],
        }
    }
}

impl RetroConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from the standard location (`<config dir>/retropulse/config.toml`),
    /// falling back to defaults when no file exists.
    pub fn load_standard() -> Result<Self, ConfigError> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(Self::default());
        };
        let path = dir.join("retropulse").join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.heartbeat_seconds == 0 {
            return Err(ConfigError::OutOfRange(
                "heartbeat_seconds must be positive".to_string(),
            ));
        }
        if self.server.idle_after_seconds < self.server.heartbeat_seconds {
            return Err(ConfigError::OutOfRange(
                "idle_after_seconds must be at least heartbeat_seconds".to_string(),
            ));
        }
        if self.boards.max_columns == 0 {
            return Err(ConfigError::OutOfRange(
                "max_columns must be positive".to_string(),
            ));
        }
        if self.boards.default_columns.len() > self.boards.max_columns as usize {
            return Err(ConfigError::OutOfRange(
                "default_columns exceeds max_columns".to_string(),
            ));
        }
        if self.quotas.max_cards_per_user == Some(0) || self.quotas.max_reactions_per_user == Some(0)
        {
            return Err(ConfigError::OutOfRange(
                "quota limits must be positive or omitted".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Value is out of valid range
    OutOfRange(String),
    /// Failed to read the config file
    Io(String),
    /// Failed to parse the config file
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            ConfigError::Io(msg) => write!(f, "Config read error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
