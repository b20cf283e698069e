//! # Snapshot Persistence
//!
//! After every accepted `INFO` or `SENS` update the full [`SensorSnapshot`] is
//! written out so that other processes on the host (dashboards, the uplink
//! daemon) can pick up the latest values. The file holds a single line in the
//! form produced by [`SensorSnapshot::render`]:
//!
//! ```text
//! $gate:open~rack:closed~pir:idle~voltage12v:12.1~voltage5v:5.02~voltage3_3v:3.29~boardTemp:41.5*
//! ```
//!
//! There is no trailing newline. Writes are last-write-wins: each flush replaces
//! the whole file atomically, so readers never observe a half-written snapshot.
//!
//! [`TokenLog`] is the bench echo's counterpart: an append-only file with one
//! received token message per line.
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, trace};

use crate::errors::PersistError;
use crate::sensors::SensorSnapshot;

/// Destination for snapshot flushes.
pub trait SnapshotSink {
    fn flush(&mut self, snapshot: &SensorSnapshot) -> Result<(), PersistError>;
}

/// Snapshot persisted to a text file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the currently persisted snapshot text, if any.
    pub fn read_current(&self) -> std::io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl SnapshotSink for SnapshotFile {
    fn flush(&mut self, snapshot: &SensorSnapshot) -> Result<(), PersistError> {
        let content = snapshot.render();
        write_file_locked(&self.path, &content)?;
        debug!("Snapshot written to {}", self.path.display());
        trace!("Snapshot content: {}", content);
        Ok(())
    }
}

/// Append-only log of token messages received by the bench echo.
///
/// One message per line. Unlike the snapshot, history is kept.
#[derive(Debug, Clone)]
pub struct TokenLog {
    path: PathBuf,
}

impl TokenLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` plus a newline under an exclusive lock.
    pub fn append(&self, message: &str) -> Result<(), PersistError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        file.write_all(message.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        let _ = file.sync_data();
        drop(file);
        trace!("Appended {} bytes to {}", message.len() + 1, self.path.display());
        Ok(())
    }

    /// Every logged message, oldest first. Missing file reads as empty.
    pub fn entries(&self) -> std::io::Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

/// Replace `path` with `content` under an exclusive lock, via temp file + rename.
fn write_file_locked(path: &Path, content: &str) -> Result<(), PersistError> {
    // Lock the destination so concurrent writers on the host serialize
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot.txt");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(PersistError::TempFile(e)),
        }
    };

    fs::rename(&tmp_path, path)?;

    // Persist the rename (best-effort)
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    drop(lock_file);
    Ok(())
}
