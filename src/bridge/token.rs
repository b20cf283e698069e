//! Token relay between the board and the remote token service.
//!
//! One exchange runs as follows:
//!
//! 1. Decode the board's payload as JSON (failure ends the exchange).
//! 2. POST it to the token endpoint. Timeouts are retried immediately,
//!    connection failures after the reconnect backoff, both without limit.
//! 3. Re-encode the service's JSON reply, clear the serial buffers and write it
//!    to the board.
//! 4. Wait the settle interval, read one line back and compare it with what
//!    was sent. Only an exact echo counts as success.
//!
//! The retry loop never gives up on its own. It ends only on a response, a
//! non-transport error, or a shutdown request observed through [`Shutdown`].
use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use serde_json::Value;

use crate::errors::{RemoteError, TokenError};
use crate::logutil::escape_log;
use crate::metrics;
use crate::serial::SerialLink;
use crate::shutdown::Shutdown;

/// Line the board sends back when it could not parse the relayed response.
pub const DEVICE_DESERIALIZE_ERROR: &str = "deserialize error";

pub const DEFAULT_TOKEN_URL: &str = "http://localhost:8085/token";

/// The remote side of the exchange.
#[allow(async_fn_in_trait)]
pub trait RemoteService {
    /// POST `body` as JSON and return the decoded JSON reply.
    async fn post_json(&self, body: &Value) -> Result<Value, RemoteError>;
}

/// Token service reached over HTTP.
pub struct HttpRemote {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpRemote {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), url, timeout)
    }

    /// Use a preconfigured client (proxy, TLS or pool settings).
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteService for HttpRemote {
    async fn post_json(&self, body: &Value) -> Result<Value, RemoteError> {
        debug!("POST {} ({} bytes)", self.url, body.to_string().len());
        let exchange = async {
            let response = self
                .client
                .post(&self.url)
                .json(body)
                .send()
                .await
                .map_err(classify_transport)?;
            let status = response.status();
            if !status.is_success() {
                warn!("Token service returned status {}", status);
            }
            response.text().await.map_err(classify_transport)
        };
        let text = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RemoteError::Timeout)??;
        serde_json::from_str(&text).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

fn classify_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unavailable(e.to_string())
    }
}

/// Textual form used when relaying the service reply to the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonStyle {
    /// `{"a": 1, "b": [1, 2]}` with non-ASCII escaped as `\uXXXX`. This is what
    /// deployed board firmware echoes back.
    #[default]
    Spaced,
    /// `{"a":1,"b":[1,2]}`.
    Compact,
}

/// Encode `value` in the given style. Key order is the order received.
pub fn encode_canonical(value: &Value, style: JsonStyle) -> Result<String, serde_json::Error> {
    match style {
        JsonStyle::Compact => serde_json::to_string(value),
        JsonStyle::Spaced => {
            let mut out = Vec::with_capacity(128);
            let mut ser = Serializer::with_formatter(&mut out, SpacedFormatter);
            value.serialize(&mut ser)?;
            // Formatter only ever writes ASCII
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
    }
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return CompactFormatter.write_string_fragment(writer, fragment);
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Timing and encoding knobs for the exchange.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Pause between writing the response and reading the board's echo.
    pub settle: Duration,
    /// Wait before retrying after the service was unreachable.
    pub reconnect_backoff: Duration,
    pub json_style: JsonStyle,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(100),
            reconnect_backoff: Duration::from_secs(5),
            json_style: JsonStyle::Spaced,
        }
    }
}

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReceipt {
    /// Response text as written to (and echoed by) the board.
    pub response: String,
    /// POST attempts made, including the successful one.
    pub attempts: u32,
}

pub struct TokenBridge<R> {
    remote: R,
    settings: TokenSettings,
    shutdown: Shutdown,
}

impl<R: RemoteService> TokenBridge<R> {
    pub fn new(remote: R, settings: TokenSettings, shutdown: Shutdown) -> Self {
        Self {
            remote,
            settings,
            shutdown,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Run one full exchange for `payload` over `serial`.
    pub async fn exchange<S: SerialLink>(
        &mut self,
        serial: &mut S,
        payload: &str,
    ) -> Result<TokenReceipt, TokenError> {
        let request: Value = serde_json::from_str(payload).map_err(TokenError::Decode)?;

        let (response, attempts) = self.post_with_retry(&request).await?;
        info!("Token service response: {}", escape_log(&response.to_string()));

        let encoded =
            encode_canonical(&response, self.settings.json_style).map_err(TokenError::Encode)?;
        serial.reset_buffers()?;
        serial.write_all(encoded.as_bytes())?;
        debug!("Relayed {} bytes to board", encoded.len());

        tokio::time::sleep(self.settings.settle).await;

        let echoed = serial.read_line()?;
        let ack = echoed.trim();
        info!("Board reply: {}", escape_log(ack));
        if ack == encoded {
            info!("Token response acknowledged after {} attempt(s)", attempts);
            Ok(TokenReceipt {
                response: encoded,
                attempts,
            })
        } else if ack == DEVICE_DESERIALIZE_ERROR {
            Err(TokenError::DeviceDeserialize)
        } else {
            Err(TokenError::AckMismatch {
                expected: encoded,
                received: ack.to_string(),
            })
        }
    }

    async fn post_with_retry(&mut self, request: &Value) -> Result<(Value, u32), TokenError> {
        let mut attempts = 0u32;
        loop {
            if self.shutdown.is_requested() {
                return Err(TokenError::Cancelled);
            }
            attempts = attempts.saturating_add(1);
            match self.remote.post_json(request).await {
                Ok(response) => return Ok((response, attempts)),
                Err(RemoteError::Timeout) => {
                    warn!("Token POST timed out (attempt {}); retrying", attempts);
                    metrics::inc_token_retries();
                    // Let a pending shutdown request land before the next attempt
                    tokio::task::yield_now().await;
                }
                Err(RemoteError::Unavailable(reason)) => {
                    warn!(
                        "Token service not available ({}); retrying in {:?}",
                        reason, self.settings.reconnect_backoff
                    );
                    metrics::inc_token_retries();
                    if !self.shutdown.sleep(self.settings.reconnect_backoff).await {
                        return Err(TokenError::Cancelled);
                    }
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}
