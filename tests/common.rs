//! Test utilities & fixtures shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rmsbridge::bridge::{RemoteService, TokenSettings};
use rmsbridge::errors::{PersistError, RemoteError};
use rmsbridge::protocol::{adler32, FrameFormat};
use rmsbridge::sensors::SensorSnapshot;
use rmsbridge::storage::SnapshotSink;
use serde_json::Value;

/// Remote token service that replays a script of outcomes.
///
/// Once the script runs out every call returns `fallback`.
pub struct ScriptedRemote {
    script: Mutex<VecDeque<Result<Value, RemoteError>>>,
    fallback: Result<Value, RemoteError>,
    requests: Mutex<Vec<Value>>,
    calls: AtomicUsize,
}

impl ScriptedRemote {
    pub fn new(script: Vec<Result<Value, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Err(RemoteError::Unavailable("script exhausted".to_string())),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with `response`.
    pub fn replying(response: Value) -> Self {
        Self::new(Vec::new()).with_fallback(Ok(response))
    }

    pub fn with_fallback(mut self, fallback: Result<Value, RemoteError>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

impl RemoteService for ScriptedRemote {
    async fn post_json(&self, body: &Value) -> Result<Value, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(body.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Snapshot sink that keeps every rendered flush in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub flushes: Vec<String>,
    pub fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            flushes: Vec::new(),
            fail: true,
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.flushes.last().map(String::as_str)
    }
}

impl SnapshotSink for MemorySink {
    fn flush(&mut self, snapshot: &SensorSnapshot) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only snapshot",
            )));
        }
        self.flushes.push(snapshot.render());
        Ok(())
    }
}

/// Token settings with waits short enough for tests.
pub fn fast_token_settings() -> TokenSettings {
    TokenSettings {
        settle: Duration::from_millis(1),
        reconnect_backoff: Duration::from_millis(1),
        ..TokenSettings::default()
    }
}

/// Hand-built frame line with the given command id, independent of the encoder.
pub fn frame_line(command: &str, payload: &str) -> String {
    format!(
        "ESP:> $_{}_{}_{}_{}_*",
        command,
        payload.chars().count(),
        payload,
        adler32(payload.as_bytes())
    )
}

pub fn codec() -> FrameFormat {
    FrameFormat::default()
}
