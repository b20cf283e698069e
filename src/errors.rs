use thiserror::Error;

/// Reasons a raw serial line fails frame validation.
///
/// Variants are listed in the order the checks run; the first failing check wins.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The line did not split into exactly six `_`-delimited fields.
    #[error("message structure is wrong: expected 6 fields, found {found}")]
    Structure { found: usize },

    /// Start or end sentinel missing.
    #[error("start or end marker missing")]
    Markers,

    /// Length or checksum field is not a non-negative integer.
    #[error("length or checksum field is not a non-negative integer")]
    FieldType,

    #[error("declared length {declared} does not match payload length {actual}")]
    LengthMismatch { declared: u64, actual: usize },

    /// Payload contains characters outside ASCII and cannot be checksummed.
    #[error("payload is not ASCII")]
    NonAsciiPayload,

    #[error("checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch { declared: u64, computed: u32 },

    #[error("unknown command id: {0}")]
    UnknownCommand(String),
}

/// Payload shape violations reported by the sensor update handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("expected {expected} parts separated by '~', found {found}")]
    PartCount { expected: usize, found: usize },

    #[error("part {index} is not a non-negative decimal number: {value:?}")]
    NotNumeric { index: usize, value: String },

    #[error("part {index} is not alphabetic: {value:?}")]
    NotAlphabetic { index: usize, value: String },
}

/// Failures of the snapshot persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create temp file for atomic write: {0}")]
    TempFile(std::io::Error),
}

/// Conditions raised by the remote token service.
///
/// `Timeout` and `Unavailable` are transport-level and retried by the token bridge;
/// the rest end the exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request timed out")]
    Timeout,

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("response is not valid JSON: {0}")]
    InvalidResponse(String),
}

/// Terminal outcomes of a failed token exchange.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The device payload was not valid JSON.
    #[error("token payload is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode remote response: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("remote service error: {0}")]
    Remote(#[from] RemoteError),

    #[error("serial error: {0}")]
    Serial(#[from] std::io::Error),

    /// The device reported it could not deserialize the relayed response.
    #[error("device could not deserialize the response")]
    DeviceDeserialize,

    #[error("acknowledgment mismatch: expected {expected:?}, received {received:?}")]
    AckMismatch { expected: String, received: String },

    /// Shutdown was requested while the exchange was waiting to retry.
    #[error("token exchange cancelled by shutdown")]
    Cancelled,
}

/// Failures of the board-side token echo.
#[derive(Debug, Error)]
pub enum EchoError {
    #[error("serial error: {0}")]
    Serial(#[from] std::io::Error),

    #[error("token log write failed: {0}")]
    Persist(#[from] PersistError),
}

/// Everything that can go wrong while handling one serial line.
#[derive(Debug, Error)]
pub enum LineError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("snapshot flush failed: {0}")]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Token(#[from] TokenError),
}
