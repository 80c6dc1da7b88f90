//! Core configuration types and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::defaults::{
    default_log_level, default_negotiation_timeout_secs, default_ping_interval_secs,
    default_throttle_ms, default_true,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where to connect.
    pub server: ServerConfig,
    /// Who to be.
    pub identity: IdentityConfig,
    /// Throttling, timers and which convenience handlers to install.
    #[serde(default)]
    pub behavior: BehaviorConfig,
    /// Logging output.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port` of the IRC server.
    pub address: String,
    /// Connect over TLS.
    #[serde(default)]
    pub tls: bool,
    /// Extra PEM CA bundle to trust (self-signed networks).
    pub ca_file: Option<PathBuf>,
}

/// Bot identity.
#[derive(Clone, Deserialize)]
pub struct IdentityConfig {
    pub nick: String,
    /// Username; defaults to the nick.
    pub user: Option<String>,
    /// Real name; defaults to the username.
    pub realname: Option<String>,
    /// Server/services password. Enables ghost recovery and identified joins.
    pub password: Option<String>,
}

impl IdentityConfig {
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.nick)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or_else(|| self.user())
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("nick", &self.nick)
            .field("user", &self.user)
            .field("realname", &self.realname)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Runtime behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct BehaviorConfig {
    /// Delay between outbound lines in milliseconds (default: 500).
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Ping watchdog period in seconds (default: 60).
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Bound on each services wait in seconds (default: 30).
    #[serde(default = "default_negotiation_timeout_secs")]
    pub negotiation_timeout_secs: u64,
    /// Channels to join after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Install the nick-in-use recovery handler.
    #[serde(default = "default_true")]
    pub recover_nick: bool,
    /// Install PING/PONG handling and the watchdog.
    #[serde(default = "default_true")]
    pub ping_pong: bool,
    /// Log inbound NOTICEs.
    #[serde(default = "default_true")]
    pub log_notices: bool,
    /// Cap on concurrently running handlers (unbounded when absent).
    pub max_concurrent_handlers: Option<usize>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            negotiation_timeout_secs: default_negotiation_timeout_secs(),
            channels: Vec::new(),
            recover_nick: true,
            ping_pong: true,
            log_notices: true,
            max_concurrent_handlers: None,
        }
    }
}

impl BehaviorConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_secs(self.negotiation_timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output (default).
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSink {
    #[default]
    Stderr,
    Stdout,
    /// Append to `log.path`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` overrides it (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub sink: LogSink,
    /// Log file for `sink = "file"`.
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            sink: LogSink::default(),
            path: None,
        }
    }
}
