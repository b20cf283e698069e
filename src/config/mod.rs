//! # Configuration Management Module
//!
//! Loads, validates and generates the bridge's TOML configuration.
//!
//! ## Configuration Structure
//!
//! - [`SerialConfig`] - Board link settings (port, baud, timeouts)
//! - [`ProtocolConfig`] - Frame markers and the token line marker
//! - [`RemoteConfig`] - Token service endpoint, timeouts and relay encoding
//! - [`SnapshotConfig`] - Where the sensor snapshot file is written
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`EchoConfig`] - Token file and partial-read threshold for the bench echo
//!
//! Every section and every field has a default, so a partial file is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rmsbridge::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Serial Port: {}", config.serial.port);
//!     println!("Token URL: {}", config.remote.token_url);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [remote]
//! token_url = "http://localhost:8085/token"
//! json_style = "spaced"
//!
//! [snapshot]
//! path = "RMS_INFO.txt"
//! ```

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::bridge::token::{JsonStyle, DEFAULT_TOKEN_URL};
use crate::echo::DEFAULT_TOKEN_FILE;
use crate::protocol::frame::{DEFAULT_END_MARKER, DEFAULT_START_MARKER, FIELD_DELIMITER};
use crate::protocol::DEFAULT_TOKEN_MARKER;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub echo: EchoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound on a single line read before the partial line is returned.
    pub read_timeout_secs: u64,
    /// Idle wait between polls when the board has sent nothing (ms).
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            read_timeout_secs: 5,
            poll_interval_ms: 10,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub start_marker: String,
    pub end_marker: String,
    /// Any line containing this substring is treated as a token request.
    pub token_marker: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            token_marker: DEFAULT_TOKEN_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub token_url: String,
    /// Per-POST timeout in seconds. A timed-out POST is retried immediately.
    pub timeout_secs: u64,
    /// Wait before retrying when the service is unreachable.
    pub reconnect_backoff_secs: u64,
    /// Pause between relaying the response and reading the board's echo (ms).
    pub settle_ms: u64,
    pub json_style: JsonStyle,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout_secs: 10,
            reconnect_backoff_secs: 5,
            settle_ms: 100,
            json_style: JsonStyle::Spaced,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "RMS_INFO.txt".to_string(),
        }
    }
}

/// Settings for the `echo` bench command, which stands in for the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Received token messages are appended here, one per line.
    pub token_file: String,
    /// Shorter messages are treated as partial reads and dropped.
    pub min_len: usize,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            token_file: DEFAULT_TOKEN_FILE.to_string(),
            min_len: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("rmsbridge.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be positive");
        }
        if self.serial.read_timeout_secs == 0 {
            bail!("serial.read_timeout_secs must be positive");
        }
        for (name, marker) in [
            ("protocol.start_marker", &self.protocol.start_marker),
            ("protocol.end_marker", &self.protocol.end_marker),
        ] {
            if marker.is_empty() {
                bail!("{} must not be empty", name);
            }
            if marker.contains(FIELD_DELIMITER) {
                bail!("{} must not contain '{}'", name, FIELD_DELIMITER);
            }
        }
        if self.protocol.token_marker.is_empty() {
            bail!("protocol.token_marker must not be empty");
        }
        if self.remote.timeout_secs == 0 {
            bail!("remote.timeout_secs must be positive");
        }
        reqwest::Url::parse(&self.remote.token_url).map_err(|e| {
            anyhow!(
                "remote.token_url '{}' is not a valid URL: {}",
                self.remote.token_url,
                e
            )
        })?;
        if self.snapshot.path.trim().is_empty() {
            bail!("snapshot.path must not be empty");
        }
        if self.echo.token_file.trim().is_empty() {
            bail!("echo.token_file must not be empty");
        }
        Ok(())
    }
}
