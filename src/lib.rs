//! # rmsbridge - Serial to HTTP Bridge for Rack Monitoring Boards
//!
//! rmsbridge sits between a rack monitoring board on a serial line and a remote
//! token service reached over HTTP.
//!
//! ## Features
//!
//! - **Framed Sensor Reports**: `ESP:> $_CMD_LEN_PAYLOAD_CHECKSUM_*` frames with length and Adler-32 verification.
//! - **Sensor Snapshot**: Gate/rack/PIR states and supply rail readings merged into one status file, rewritten atomically on every update.
//! - **Token Relay**: Token requests are POSTed to the service, the reply is written back to the board and the board's echo verified byte for byte.
//! - **Resilient Retry**: Service timeouts and outages are retried without limit; only shutdown ends the wait.
//! - **Async Design**: One sequential Tokio loop; serial, HTTP and snapshot storage sit behind traits for testing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # {
//! use rmsbridge::bridge::{Bridge, BridgeSettings, HttpRemote};
//! use rmsbridge::config::Config;
//! use rmsbridge::serial::SerialPortLink;
//! use rmsbridge::shutdown::Shutdown;
//! use rmsbridge::storage::SnapshotFile;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let serial = SerialPortLink::open(
//!         &config.serial.port,
//!         config.serial.baud_rate,
//!         config.serial.read_timeout(),
//!     )?;
//!     let (_handle, shutdown) = Shutdown::channel();
//!     let mut bridge = Bridge::new(
//!         serial,
//!         SnapshotFile::new(&config.snapshot.path),
//!         HttpRemote::new(&config.remote.token_url, config.remote.timeout()),
//!         BridgeSettings::from_config(&config),
//!         shutdown,
//!     );
//!     bridge.run().await;
//!     Ok(())
//! }
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`bridge`] - Dispatch loop, command registry and token relay
//! - [`protocol`] - Frame codec, Adler-32 checksum and line classification
//! - [`sensors`] - Sensor payload parsing and the snapshot record
//! - [`serial`] - Serial link abstraction, line assembly and a scripted fake
//! - [`storage`] - Atomic snapshot file persistence
//! - [`config`] - Configuration loading and validation
//! - [`echo`] - Board-side token echo for bench testing
//! - [`errors`] - Error types for each stage of line handling
//! - [`shutdown`] - Cooperative shutdown signal
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Serial Link    │ ← Board I/O (lines in, token replies out)
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Bridge Loop    │ ← Classify, validate, dispatch
//! └─────────────────┘
//!     │         │
//! ┌────────┐ ┌────────────┐
//! │Snapshot│ │Token Relay │ ← File on disk / HTTP service
//! └────────┘ └────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod echo;
pub mod errors;
pub mod logutil;
pub mod metrics;
pub mod protocol;
pub mod sensors;
pub mod serial;
pub mod shutdown;
pub mod storage;
