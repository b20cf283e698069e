//! Process-wide counters for the bridge.
//! Read with [`snapshot`]; logged at debug level when the bridge shuts down.
use std::sync::atomic::{AtomicU64, Ordering};

static FRAMES_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static FRAMES_REJECTED: AtomicU64 = AtomicU64::new(0);
static PAYLOADS_REJECTED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_FLUSHES: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_FLUSH_FAILURES: AtomicU64 = AtomicU64::new(0);
static TOKEN_SUCCEEDED: AtomicU64 = AtomicU64::new(0);
static TOKEN_FAILED: AtomicU64 = AtomicU64::new(0);
static TOKEN_RETRIES: AtomicU64 = AtomicU64::new(0);

pub fn inc_frames_accepted() {
    FRAMES_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_frames_rejected() {
    FRAMES_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_payloads_rejected() {
    PAYLOADS_REJECTED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_snapshot_flushes() {
    SNAPSHOT_FLUSHES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_snapshot_flush_failures() {
    SNAPSHOT_FLUSH_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_token_succeeded() {
    TOKEN_SUCCEEDED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_token_failed() {
    TOKEN_FAILED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_token_retries() {
    TOKEN_RETRIES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub frames_accepted: u64,
    pub frames_rejected: u64,
    pub payloads_rejected: u64,
    pub snapshot_flushes: u64,
    pub snapshot_flush_failures: u64,
    pub token_succeeded: u64,
    pub token_failed: u64,
    pub token_retries: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        frames_accepted: FRAMES_ACCEPTED.load(Ordering::Relaxed),
        frames_rejected: FRAMES_REJECTED.load(Ordering::Relaxed),
        payloads_rejected: PAYLOADS_REJECTED.load(Ordering::Relaxed),
        snapshot_flushes: SNAPSHOT_FLUSHES.load(Ordering::Relaxed),
        snapshot_flush_failures: SNAPSHOT_FLUSH_FAILURES.load(Ordering::Relaxed),
        token_succeeded: TOKEN_SUCCEEDED.load(Ordering::Relaxed),
        token_failed: TOKEN_FAILED.load(Ordering::Relaxed),
        token_retries: TOKEN_RETRIES.load(Ordering::Relaxed),
    }
}
