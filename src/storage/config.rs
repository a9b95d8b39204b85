//! Application config persistence (`~/.todo-rs/config.toml`)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{Result, TodoError};

/// Application config
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DatabaseConfig {
    /// SQLite file; `None` ⇒ `~/.todo-rs/todo.sqlite3`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir().join("todo.sqlite3"))
    }
}

/// Ten years
pub const MAX_TOKEN_TTL_HOURS: u32 = 87_600;
pub const MAX_USERNAME_COOLDOWN_DAYS: u32 = 3_650;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Token lifetime; `None` ⇒ tokens live until logout
    #[serde(default)]
    pub token_ttl_hours: Option<u32>,
    /// Minimum days between two username changes
    #[serde(default = "default_username_cooldown")]
    pub username_change_cooldown_days: u32,
}

fn default_username_cooldown() -> u32 {
    14
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: None,
            username_change_cooldown_days: default_username_cooldown(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TasksConfig {
    /// Offset used for the "today" window when the caller sends none
    #[serde(default)]
    pub default_utc_offset_minutes: i32,
}

impl Config {
    /// Reject values that would only fail later at request time.
    pub fn validate(&self) -> Result<()> {
        if !crate::model::task::is_valid_utc_offset(self.tasks.default_utc_offset_minutes) {
            return Err(TodoError::config(format!(
                "tasks.default_utc_offset_minutes out of range: {}",
                self.tasks.default_utc_offset_minutes
            )));
        }
        if self.auth.token_ttl_hours == Some(0) {
            return Err(TodoError::config(
                "auth.token_ttl_hours must be positive (omit it for no expiry)",
            ));
        }
        if let Some(hours) = self.auth.token_ttl_hours.filter(|h| *h > MAX_TOKEN_TTL_HOURS) {
            return Err(TodoError::config(format!(
                "auth.token_ttl_hours must be at most {} (got {})",
                MAX_TOKEN_TTL_HOURS, hours
            )));
        }
        if self.auth.username_change_cooldown_days > MAX_USERNAME_COOLDOWN_DAYS {
            return Err(TodoError::config(format!(
                "auth.username_change_cooldown_days must be at most {} (got {})",
                MAX_USERNAME_COOLDOWN_DAYS, self.auth.username_change_cooldown_days
            )));
        }
        Ok(())
    }
}

/// Path of the config file
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Load config from `path`; a missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load config (defaults when absent)
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path())
}

/// Save config to `path`, creating parent directories.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
