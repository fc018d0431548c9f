//! TOML configuration loading and validation.
//!
//! The bridge runs embedded in the host process, so configuration is
//! optional: `NANOBRIDGE_CONFIG` may point at a TOML file, otherwise
//! `nanobridge.toml` in the working directory is used if present, otherwise
//! every field takes its built-in default. A missing file is fine; a
//! malformed one is an error.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable naming an explicit config file path.
pub const CONFIG_ENV: &str = "NANOBRIDGE_CONFIG";

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "nanobridge.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8888
}
fn default_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Status polls while waiting for a market-order fill.
    #[serde(default = "default_fill_attempts")]
    pub fill_poll_attempts: u32,
    #[serde(default = "default_fill_interval")]
    pub fill_poll_interval_ms: u64,
    /// Position polls after an observed fill (diagnostic only).
    #[serde(default = "default_reconcile_attempts")]
    pub reconcile_attempts: u32,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_ms: u64,
    /// Terminal orders retained before the oldest are retired.
    #[serde(default = "default_history_cap")]
    pub order_history_cap: usize,
}

fn default_fill_attempts() -> u32 {
    10
}
fn default_fill_interval() -> u64 {
    100
}
fn default_reconcile_attempts() -> u32 {
    10
}
fn default_reconcile_interval() -> u64 {
    100
}
fn default_history_cap() -> usize {
    100
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fill_poll_attempts: default_fill_attempts(),
            fill_poll_interval_ms: default_fill_interval(),
            reconcile_attempts: default_reconcile_attempts(),
            reconcile_interval_ms: default_reconcile_interval(),
            order_history_cap: default_history_cap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Cap advertised to the host for a single bar request.
    #[serde(default = "default_max_bars")]
    pub max_bars_per_request: u32,
}

fn default_max_bars() -> u32 {
    1000
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_bars_per_request: default_max_bars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Poll interval the host is told to use between status calls.
    #[serde(default = "default_poll_wait")]
    pub poll_wait_ms: u32,
    #[serde(default = "default_max_requests")]
    pub max_requests_per_sec: u32,
    /// Hour offset of the external application's clock from UTC.
    #[serde(default = "default_broker_zone")]
    pub broker_zone_hours: i32,
}

fn default_poll_wait() -> u32 {
    50
}
fn default_max_requests() -> u32 {
    10
}
fn default_broker_zone() -> i32 {
    -5
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_wait_ms: default_poll_wait(),
            max_requests_per_sec: default_max_requests(),
            broker_zone_hours: default_broker_zone(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config the embedded module should run with: explicit env
    /// path, working-directory file, or defaults.
    pub fn load_or_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if self.connection.port == 0 {
            return Err(Error::Config("port must be > 0".into()));
        }
        if self.execution.fill_poll_attempts == 0 {
            return Err(Error::Config("fill_poll_attempts must be > 0".into()));
        }
        if self.execution.order_history_cap == 0 {
            return Err(Error::Config("order_history_cap must be > 0".into()));
        }
        if self.history.max_bars_per_request == 0 {
            return Err(Error::Config("max_bars_per_request must be > 0".into()));
        }
        Ok(())
    }

    /// Connection address string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.connection.host, self.connection.port)
    }
}
