//! # Bridge Core
//!
//! Ties the serial link, frame codec, command registry, sensor snapshot and
//! token relay into one sequential processing loop.
//!
//! ```text
//! serial line ──► classify ──┬─ token marker ─────────────► TokenBridge
//!                            └─ framed ─► FrameFormat::parse
//!                                          │
//!                                          ▼
//!                                   CommandRegistry
//!                           INFO ──► NumericQuad ─┐
//!                           SENS ──► AlphaTriplet ┼─► snapshot flush
//!                           TOKN ──► TokenBridge  │
//! ```
//!
//! Every per-line failure is logged and the line dropped; the loop itself only
//! stops when shutdown is requested.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # {
//! use std::time::Duration;
//! use rmsbridge::bridge::{Bridge, BridgeSettings, HttpRemote};
//! use rmsbridge::config::Config;
//! use rmsbridge::serial::SerialPortLink;
//! use rmsbridge::shutdown::Shutdown;
//! use rmsbridge::storage::SnapshotFile;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let serial = SerialPortLink::open("/dev/ttyUSB0", 115200, Duration::from_secs(5))?;
//!     let remote = HttpRemote::new(&config.remote.token_url, config.remote.timeout());
//!     let (_handle, shutdown) = Shutdown::channel();
//!     let mut bridge = Bridge::new(
//!         serial,
//!         SnapshotFile::new(&config.snapshot.path),
//!         remote,
//!         BridgeSettings::from_config(&config),
//!         shutdown,
//!     );
//!     bridge.run().await;
//!     Ok(())
//! }
//! # }
//! ```

pub mod registry;
pub mod token;

use std::io;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::Config;
use crate::errors::{LineError, PersistError};
use crate::logutil::escape_log;
use crate::metrics;
use crate::protocol::{classify, strip_line_ending, Command, FrameFormat, LineKind};
use crate::sensors::{AlphaTriplet, NumericQuad, SensorSnapshot};
use crate::serial::SerialLink;
use crate::shutdown::Shutdown;
use crate::storage::SnapshotSink;

pub use registry::{CommandRegistry, Handler};
pub use token::{HttpRemote, JsonStyle, RemoteService, TokenBridge, TokenReceipt, TokenSettings};

/// Pause after a serial read error before polling again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Where a validated line goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Token exchange with this JSON payload (raw line or `TOKN` frame payload).
    Token(String),
    Numeric(NumericQuad),
    Alpha(AlphaTriplet),
}

/// What handling a line achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line (read timeout or stray terminator); nothing to do.
    Empty,
    /// Snapshot slots owned by this command were overwritten and flushed.
    SensorsUpdated(Command),
    TokenRelayed(TokenReceipt),
}

/// Side-effect free line validation: classification, frame checks, registry
/// lookup and payload shape.
#[derive(Debug, Clone)]
pub struct Router {
    codec: FrameFormat,
    token_marker: String,
    registry: CommandRegistry,
}

impl Router {
    pub fn new(codec: FrameFormat, token_marker: impl Into<String>) -> Self {
        Self {
            codec,
            token_marker: token_marker.into(),
            registry: CommandRegistry::new(),
        }
    }

    pub fn codec(&self) -> &FrameFormat {
        &self.codec
    }

    /// Validate `line` (line ending already stripped) and decide its route.
    pub fn inspect(&self, line: &str) -> Result<Route, LineError> {
        let framed = match classify(line, &self.token_marker) {
            LineKind::Token(payload) => return Ok(Route::Token(payload.to_string())),
            LineKind::Framed(framed) => framed,
        };
        let frame = self.codec.parse(framed).map_err(|e| {
            metrics::inc_frames_rejected();
            e
        })?;
        metrics::inc_frames_accepted();
        debug!(
            "Frame accepted: cmd={} len={} checksum={}",
            frame.command, frame.declared_len, frame.declared_checksum
        );
        let route = match self.registry.handler(frame.command) {
            Handler::NumericQuad => NumericQuad::parse(&frame.payload).map(Route::Numeric),
            Handler::AlphaTriplet => AlphaTriplet::parse(&frame.payload).map(Route::Alpha),
            Handler::TokenExchange => Ok(Route::Token(frame.payload)),
        };
        route.map_err(|e| {
            metrics::inc_payloads_rejected();
            e.into()
        })
    }
}

/// Runtime settings for [`Bridge`].
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub frame: FrameFormat,
    pub token_marker: String,
    /// Idle wait between polls when no input is pending.
    pub poll_interval: Duration,
    pub token: TokenSettings,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            frame: FrameFormat::default(),
            token_marker: crate::protocol::DEFAULT_TOKEN_MARKER.to_string(),
            poll_interval: Duration::from_millis(10),
            token: TokenSettings::default(),
        }
    }
}

impl BridgeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame: FrameFormat::new(
                config.protocol.start_marker.clone(),
                config.protocol.end_marker.clone(),
            ),
            token_marker: config.protocol.token_marker.clone(),
            poll_interval: Duration::from_millis(config.serial.poll_interval_ms),
            token: TokenSettings {
                settle: Duration::from_millis(config.remote.settle_ms),
                reconnect_backoff: Duration::from_secs(config.remote.reconnect_backoff_secs),
                json_style: config.remote.json_style,
            },
        }
    }
}

/// The sequential bridge loop and the state it owns.
pub struct Bridge<S, P, R> {
    serial: S,
    sink: P,
    router: Router,
    snapshot: SensorSnapshot,
    token: TokenBridge<R>,
    shutdown: Shutdown,
    poll_interval: Duration,
}

impl<S, P, R> Bridge<S, P, R>
where
    S: SerialLink,
    P: SnapshotSink,
    R: RemoteService,
{
    pub fn new(serial: S, sink: P, remote: R, settings: BridgeSettings, shutdown: Shutdown) -> Self {
        Self {
            serial,
            sink,
            router: Router::new(settings.frame, settings.token_marker),
            snapshot: SensorSnapshot::new(),
            token: TokenBridge::new(remote, settings.token, shutdown.clone()),
            shutdown,
            poll_interval: settings.poll_interval,
        }
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn remote(&self) -> &R {
        self.token.remote()
    }

    /// Poll until shutdown is requested. Never returns early on line errors.
    pub async fn run(&mut self) {
        info!("Bridge loop started");
        while !self.shutdown.is_requested() {
            match self.poll_once().await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    if !self.shutdown.sleep(self.poll_interval).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Serial read error: {} - continuing", e);
                    if !self.shutdown.sleep(READ_ERROR_BACKOFF).await {
                        break;
                    }
                }
            }
        }
        info!("Bridge loop stopped");
        debug!("Bridge counters: {:?}", metrics::snapshot());
    }

    /// One loop iteration: if input is pending, read and handle a single line.
    /// `Ok(None)` means nothing was available.
    pub async fn poll_once(&mut self) -> io::Result<Option<Result<LineOutcome, LineError>>> {
        if self.serial.bytes_available()? == 0 {
            return Ok(None);
        }
        let raw = self.serial.read_line()?;
        Ok(Some(self.handle_line(&raw).await))
    }

    /// Handle one raw line. Failures are logged here and returned for callers
    /// that want to inspect them; none of them is fatal.
    pub async fn handle_line(&mut self, raw: &str) -> Result<LineOutcome, LineError> {
        let line = strip_line_ending(raw);
        if line.is_empty() {
            debug!("Ignoring blank line");
            return Ok(LineOutcome::Empty);
        }
        info!("ESP> {}", escape_log(line));
        let result = self.process(line).await;
        if let Err(ref e) = result {
            warn!("Line rejected: {}", e);
        }
        result
    }

    async fn process(&mut self, line: &str) -> Result<LineOutcome, LineError> {
        match self.router.inspect(line)? {
            Route::Numeric(readings) => {
                info!(
                    "Voltage sensors and temperature: 12V={} 5V={} 3.3V={} temp={}",
                    readings.voltage_12v,
                    readings.voltage_5v,
                    readings.voltage_3v3,
                    readings.board_temp
                );
                self.snapshot.readings = readings;
                self.flush_snapshot()?;
                Ok(LineOutcome::SensorsUpdated(Command::Info))
            }
            Route::Alpha(states) => {
                info!(
                    "Sensor states: gate={} rack={} pir={}",
                    states.gate, states.rack, states.pir
                );
                self.snapshot.states = states;
                self.flush_snapshot()?;
                Ok(LineOutcome::SensorsUpdated(Command::Sens))
            }
            Route::Token(payload) => match self.token.exchange(&mut self.serial, &payload).await {
                Ok(receipt) => {
                    metrics::inc_token_succeeded();
                    Ok(LineOutcome::TokenRelayed(receipt))
                }
                Err(e) => {
                    metrics::inc_token_failed();
                    Err(e.into())
                }
            },
        }
    }

    fn flush_snapshot(&mut self) -> Result<(), PersistError> {
        match self.sink.flush(&self.snapshot) {
            Ok(()) => {
                metrics::inc_snapshot_flushes();
                Ok(())
            }
            Err(e) => {
                metrics::inc_snapshot_flush_failures();
                Err(e)
            }
        }
    }
}
