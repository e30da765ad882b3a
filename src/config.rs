//! Configuration loading.
//!
//! The daemon reads a TOML file describing the local user and the upstream
//! servers to hold open. Paths default into a per-user data directory; both
//! the config file location and the socket path can be overridden.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Nick used on servers whose block doesn't name its own.
    pub default_user_name: String,
    /// Local socket path override.
    pub socket: Option<PathBuf>,
    /// Upstream servers, keyed by their configured label.
    #[serde(default)]
    pub servers: HashMap<String, ServerBlock>,
}

/// One upstream IRC server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerBlock {
    /// Nick on this server; falls back to `default_user_name`.
    pub user_name: Option<String>,
    /// Password for the identify exchange after registration.
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub security: Security,
    /// Channels joined right after registration.
    #[serde(default)]
    pub default_channels: Vec<String>,
    /// Identify command template; `{password}` is substituted at send time.
    #[serde(default = "default_identify")]
    pub identify: String,
}

impl ServerBlock {
    /// The nick to register with on this server.
    pub fn nick<'a>(&'a self, default_user_name: &'a str) -> &'a str {
        self.user_name.as_deref().unwrap_or(default_user_name)
    }
}

/// Transport security for an upstream connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    #[default]
    Plain,
    Tls,
}

fn default_identify() -> String {
    "PRIVMSG NickServ :IDENTIFY {password}".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// The socket path this daemon serves on: the `socket` override, or
    /// `hircd.sock` in the user data directory.
    pub fn socket_path(&self) -> PathBuf {
        self.socket.clone().unwrap_or_else(default_socket_path)
    }
}

/// Per-user data directory for the daemon's files.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hircd")
}

/// Default config file location: `<data-dir>/config.toml`.
pub fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Default socket location: `<data-dir>/hircd.sock`. Shared with the client
/// so both ends agree without arguments.
pub fn default_socket_path() -> PathBuf {
    data_dir().join("hircd.sock")
}
