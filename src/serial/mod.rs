//! # Serial Link
//!
//! The bridge core only needs four operations from the UART, captured by the
//! [`SerialLink`] trait. [`SerialPortLink`] implements them over the
//! `serialport` crate (feature `serial`); [`fake::FakeSerial`] scripts them for
//! tests.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! read_timeout_secs = 5
//! ```

pub mod fake;
pub mod line;

use std::io;

pub use fake::FakeSerial;
pub use line::LineAssembler;

/// Narrow interface to the serial channel.
///
/// All calls block; `read_line` is bounded by the link's read timeout and may
/// return a partial (or empty) line when it expires.
pub trait SerialLink {
    /// Read one line, terminator included when one arrived in time.
    fn read_line(&mut self) -> io::Result<String>;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Bytes ready to be read without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Discard anything buffered in either direction.
    fn reset_buffers(&mut self) -> io::Result<()>;
}

#[cfg(feature = "serial")]
pub use port::SerialPortLink;

#[cfg(feature = "serial")]
mod port {
    use std::io::{self, Read, Write};
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Result};
    use log::{debug, info, trace};
    use serialport::{ClearBuffer, SerialPort};

    use super::{LineAssembler, SerialLink};
    use crate::logutil::escape_log;

    /// Granularity of individual port reads while waiting for a full line.
    const READ_SLICE: Duration = Duration::from_millis(100);

    /// Serial link over a real UART, 8N1.
    pub struct SerialPortLink {
        port: Box<dyn SerialPort>,
        lines: LineAssembler,
        read_timeout: Duration,
    }

    impl SerialPortLink {
        /// Open and configure `port_name`. Any stale bytes the board printed
        /// before we attached are discarded.
        pub fn open(port_name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
            info!(
                "Opening serial port {} at {} baud (read timeout {:?})",
                port_name, baud_rate, read_timeout
            );
            let mut builder = serialport::new(port_name, baud_rate).timeout(READ_SLICE);
            #[cfg(unix)]
            {
                builder = builder
                    .data_bits(serialport::DataBits::Eight)
                    .stop_bits(serialport::StopBits::One)
                    .parity(serialport::Parity::None);
            }
            let port = builder
                .open()
                .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;
            Self::from_port(port, read_timeout)
        }

        /// Wrap an already-open port.
        pub fn from_port(mut port: Box<dyn SerialPort>, read_timeout: Duration) -> Result<Self> {
            let _ = port.write_data_terminal_ready(true);
            let _ = port.write_request_to_send(true);
            // Small settle delay
            std::thread::sleep(Duration::from_millis(150));
            let stale = port.bytes_to_read().unwrap_or(0);
            port.clear(ClearBuffer::Input)
                .map_err(|e| anyhow!("Failed to flush serial input: {}", e))?;
            debug!("Serial port initialized, flushed {} stale bytes", stale);
            Ok(Self {
                port,
                lines: LineAssembler::new(),
                read_timeout,
            })
        }

        pub fn name(&self) -> Option<String> {
            self.port.name()
        }
    }

    impl SerialLink for SerialPortLink {
        fn read_line(&mut self) -> io::Result<String> {
            let deadline = Instant::now() + self.read_timeout;
            let mut buffer = [0u8; 256];
            loop {
                if let Some(line) = self.lines.next_line() {
                    trace!("RX line: {}", escape_log(&line));
                    return Ok(line);
                }
                if Instant::now() >= deadline {
                    let partial = self.lines.take_partial().unwrap_or_default();
                    debug!("Serial read timed out with {} bytes pending", partial.len());
                    return Ok(partial);
                }
                match self.port.read(&mut buffer) {
                    Ok(n) if n > 0 => self.lines.push(&buffer[..n]),
                    Ok(_) => {}
                    Err(ref e)
                        if e.kind() == io::ErrorKind::TimedOut
                            || e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.port.write_all(bytes)?;
            self.port.flush()
        }

        fn bytes_available(&mut self) -> io::Result<usize> {
            let pending = self.port.bytes_to_read().map_err(io::Error::from)?;
            Ok(self.lines.len() + pending as usize)
        }

        fn reset_buffers(&mut self) -> io::Result<()> {
            self.lines.clear();
            self.port.clear(ClearBuffer::All).map_err(io::Error::from)
        }
    }
}
