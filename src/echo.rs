//! # Bench Token Echo
//!
//! Board-side stand-in used to exercise the token relay without firmware. It
//! plays the role the board has during an exchange:
//!
//! 1. Wait for a message on the serial link.
//! 2. Treat anything shorter than `min_len` bytes as a partial read: discard
//!    pending input and wait for the next message.
//! 3. Append the message to the token file, one message per line.
//! 4. Write the received bytes back unchanged so the bridge's echo check passes.
//!
//! ```toml
//! [echo]
//! token_file = "tokenfile.txt"
//! min_len = 0
//! ```
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::Config;
use crate::errors::EchoError;
use crate::logutil::escape_log;
use crate::protocol::strip_line_ending;
use crate::serial::SerialLink;
use crate::shutdown::Shutdown;
use crate::storage::TokenLog;

pub const DEFAULT_TOKEN_FILE: &str = "tokenfile.txt";

/// Wait after a failed read or write before polling again.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct EchoSettings {
    /// Messages shorter than this many bytes are dropped as partial reads.
    pub min_len: usize,
    pub poll_interval: Duration,
}

impl Default for EchoSettings {
    fn default() -> Self {
        Self {
            min_len: 0,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl EchoSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_len: config.echo.min_len,
            poll_interval: Duration::from_millis(config.serial.poll_interval_ms),
        }
    }
}

/// What a single poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoOutcome {
    /// Nothing pending, or only a blank line.
    Idle,
    /// Message dropped as a partial read; input was flushed.
    Short { len: usize },
    /// Message logged and written back. Holds the text without line ending.
    Echoed(String),
}

pub struct TokenEcho<S> {
    serial: S,
    log: TokenLog,
    settings: EchoSettings,
    shutdown: Shutdown,
}

impl<S: SerialLink> TokenEcho<S> {
    pub fn new(serial: S, log: TokenLog, settings: EchoSettings, shutdown: Shutdown) -> Self {
        Self {
            serial,
            log,
            settings,
            shutdown,
        }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn log(&self) -> &TokenLog {
        &self.log
    }

    /// Read and handle at most one message.
    pub fn poll_once(&mut self) -> Result<EchoOutcome, EchoError> {
        if self.serial.bytes_available()? == 0 {
            return Ok(EchoOutcome::Idle);
        }
        let raw = self.serial.read_line()?;
        let message = strip_line_ending(&raw);
        if message.is_empty() {
            return Ok(EchoOutcome::Idle);
        }
        if message.len() < self.settings.min_len {
            info!("Partial read: {} bytes", message.len());
            self.serial.reset_buffers()?;
            return Ok(EchoOutcome::Short { len: message.len() });
        }

        self.log.append(message)?;
        info!(
            "Wrote {} bytes to {}",
            message.len(),
            self.log.path().display()
        );
        debug!("Received message: {}", escape_log(message));

        self.serial.write_all(raw.as_bytes())?;
        info!("Echoed message to board link");
        Ok(EchoOutcome::Echoed(message.to_string()))
    }

    /// Echo messages until shutdown, or until the first echo when `once` is
    /// set. Returns how many messages were echoed.
    pub async fn run(&mut self, once: bool) -> usize {
        info!(
            "Token echo started (log {}, min length {})",
            self.log.path().display(),
            self.settings.min_len
        );
        let mut echoed = 0usize;
        while !self.shutdown.is_requested() {
            let wait = match self.poll_once() {
                Ok(EchoOutcome::Echoed(_)) => {
                    echoed += 1;
                    if once {
                        break;
                    }
                    continue;
                }
                Ok(EchoOutcome::Idle) | Ok(EchoOutcome::Short { .. }) => self.settings.poll_interval,
                Err(e) => {
                    warn!("Echo failed: {} - continuing", e);
                    ERROR_BACKOFF
                }
            };
            if !self.shutdown.sleep(wait).await {
                break;
            }
        }
        info!("Token echo stopped after {} message(s)", echoed);
        echoed
    }
}
