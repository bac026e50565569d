//! Configuration management for the mirror agent.
//!
//! Loads configuration from a TOML file; CLI flags override loaded values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote content service
    pub base_url: String,

    /// Bearer token sent with every request
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Root directory holding one subdirectory per mirrored group
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Move local files that disappeared remotely into the archive
    #[serde(default)]
    pub delete_removed: bool,

    /// Maximum download attempts per file
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Groups to mirror by id (empty = all eligible groups)
    #[serde(default)]
    pub groups: Vec<i64>,

    /// Mirror groups from every cycle instead of only the newest one
    #[serde(default)]
    pub all_cycles: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_timeout_secs() -> u64 {
    30
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("mirror")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
