//! Binary entrypoint for the rmsbridge CLI.
//!
//! Commands:
//! - `start [--port <path>]` - open the board's serial port and run the bridge until Ctrl-C
//! - `init` - create a starter `config.toml`
//! - `check <line>` - validate one board line offline and print where it would go
//! - `frame <INFO|SENS|TOKN> <payload>` - print a correctly framed wire line
//! - `status` - print the effective configuration and the current snapshot file
//! - `echo [--port <path>] [--once]` - act as the board on a bench link: log each token message and echo it back
//!
//! See the library crate docs for module‑level details: `rmsbridge::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use rmsbridge::bridge::{Route, Router};
use rmsbridge::config::Config;
use rmsbridge::protocol::{strip_line_ending, Command, FrameFormat};
use rmsbridge::storage::SnapshotFile;

#[derive(Parser)]
#[command(name = "rmsbridge")]
#[command(about = "Serial to HTTP bridge for rack monitoring boards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge
    Start {
        /// Board serial port (e.g., /dev/ttyUSB0); overrides the config file
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Validate a single board line without touching any device
    Check {
        /// Raw line as the board would send it
        line: String,
    },
    /// Encode a payload into a wire frame
    Frame {
        /// Command identifier: INFO, SENS or TOKN
        command: String,
        /// Frame payload, e.g. 12.1~5.02~3.29~41.5
        payload: String,
    },
    /// Show configuration and the last persisted snapshot
    Status,
    /// Stand in for the board: append received token messages to the token file and echo them back
    Echo {
        /// Serial port the bridge is wired to; overrides the config file
        #[arg(short, long)]
        port: Option<String>,
        /// Exit after the first echoed message
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting rmsbridge v{}", env!("CARGO_PKG_VERSION"));
            let port = port.unwrap_or_else(|| config.serial.port.clone());
            run_bridge(config, &port).await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new rmsbridge configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check { line } => {
            init_logging(&None, cli.verbose);
            let config = load_or_default(&cli.config).await;
            let router = Router::new(
                FrameFormat::new(
                    config.protocol.start_marker.clone(),
                    config.protocol.end_marker.clone(),
                ),
                config.protocol.token_marker.clone(),
            );
            match router.inspect(strip_line_ending(&line)) {
                Ok(Route::Token(payload)) => println!("token exchange: {}", payload),
                Ok(Route::Numeric(q)) => println!(
                    "INFO -> voltage12v={} voltage5v={} voltage3_3v={} boardTemp={}",
                    q.voltage_12v, q.voltage_5v, q.voltage_3v3, q.board_temp
                ),
                Ok(Route::Alpha(t)) => {
                    println!("SENS -> gate={} rack={} pir={}", t.gate, t.rack, t.pir)
                }
                Err(e) => {
                    println!("rejected: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Frame { command, payload } => {
            init_logging(&None, cli.verbose);
            let config = load_or_default(&cli.config).await;
            let command = Command::from_id(&command.to_ascii_uppercase())
                .ok_or_else(|| anyhow!("unknown command '{}' (expected INFO, SENS or TOKN)", command))?;
            let codec = FrameFormat::new(
                config.protocol.start_marker.clone(),
                config.protocol.end_marker.clone(),
            );
            println!("{}", codec.encode(command, &payload)?);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            println!("rmsbridge v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "serial:   {} @ {} baud (read timeout {}s)",
                config.serial.port, config.serial.baud_rate, config.serial.read_timeout_secs
            );
            println!(
                "remote:   {} (timeout {}s, backoff {}s, {:?} JSON)",
                config.remote.token_url,
                config.remote.timeout_secs,
                config.remote.reconnect_backoff_secs,
                config.remote.json_style
            );
            println!(
                "echo:     {} (min length {})",
                config.echo.token_file, config.echo.min_len
            );
            let snapshot = SnapshotFile::new(&config.snapshot.path);
            match snapshot.read_current()? {
                Some(text) => println!("snapshot: {} -> {}", config.snapshot.path, text),
                None => println!("snapshot: {} (not written yet)", config.snapshot.path),
            }
        }
        Commands::Echo { port, once } => {
            let config = load_or_default(&cli.config).await;
            init_logging(&Some(config.clone()), cli.verbose);
            let port = port.unwrap_or_else(|| config.serial.port.clone());
            run_echo(config, &port, once).await?;
        }
    }

    Ok(())
}

/// Offline commands work without a config file.
async fn load_or_default(path: &str) -> Config {
    match Config::load(path).await {
        Ok(config) => config,
        Err(e) => {
            warn!("{} - using defaults", e);
            Config::default()
        }
    }
}

#[cfg(feature = "serial")]
async fn run_bridge(config: Config, port: &str) -> Result<()> {
    use rmsbridge::bridge::{Bridge, BridgeSettings, HttpRemote};
    use rmsbridge::serial::SerialPortLink;
    use rmsbridge::shutdown::Shutdown;

    let serial = SerialPortLink::open(port, config.serial.baud_rate, config.serial.read_timeout())
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port, e))?;
    info!("Connected to board on {}", port);

    let (handle, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        handle.trigger();
    });

    let remote = HttpRemote::new(config.remote.token_url.clone(), config.remote.timeout());
    info!("Token service: {}", remote.url());
    let mut bridge = Bridge::new(
        serial,
        SnapshotFile::new(&config.snapshot.path),
        remote,
        BridgeSettings::from_config(&config),
        shutdown,
    );
    bridge.run().await;
    Ok(())
}

#[cfg(feature = "serial")]
async fn run_echo(config: Config, port: &str, once: bool) -> Result<()> {
    use rmsbridge::echo::{EchoSettings, TokenEcho};
    use rmsbridge::serial::SerialPortLink;
    use rmsbridge::shutdown::Shutdown;
    use rmsbridge::storage::TokenLog;

    let serial = SerialPortLink::open(port, config.serial.baud_rate, config.serial.read_timeout())
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port, e))?;

    let (handle, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        handle.trigger();
    });

    let mut echo = TokenEcho::new(
        serial,
        TokenLog::new(&config.echo.token_file),
        EchoSettings::from_config(&config),
        shutdown,
    );
    echo.run(once).await;
    Ok(())
}

#[cfg(not(feature = "serial"))]
async fn run_echo(_config: Config, port: &str, _once: bool) -> Result<()> {
    Err(anyhow!(
        "cannot open {}: rmsbridge was built without the 'serial' feature",
        port
    ))
}

#[cfg(not(feature = "serial"))]
async fn run_bridge(_config: Config, port: &str) -> Result<()> {
    Err(anyhow!(
        "cannot open {}: rmsbridge was built without the 'serial' feature",
        port
    ))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });
    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
