//! # Board Wire Protocol
//!
//! The monitoring board talks to the bridge over a UART using newline-terminated
//! ASCII lines. Two kinds of line exist:
//!
//! - **Framed lines**: `START_CMD_LEN_PAYLOAD_CHECKSUM_END`, validated by
//!   [`FrameFormat::parse`]. `LEN` is the character count of `PAYLOAD`, `CHECKSUM`
//!   its decimal Adler-32 (see [`checksum`]).
//! - **Token lines**: free-form JSON lines recognised by a marker substring
//!   (`token`). These carry no length or checksum and bypass the frame codec.
//!
//! Token detection by substring is a quirk of the board firmware: any line that
//! happens to contain the marker is treated as a token request, framed or not.
//! Keep it until the firmware grows a proper framed token message.

pub mod checksum;
pub mod frame;

pub use checksum::adler32;
pub use frame::{Command, Frame, FrameFormat, FIELD_DELIMITER};

/// Default substring identifying a token line.
pub const DEFAULT_TOKEN_MARKER: &str = "token";

/// Separator between parts of a sensor payload.
pub const PAYLOAD_DELIMITER: char = '~';

/// How an incoming line will be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Unframed token request; the whole line is the JSON payload.
    Token(&'a str),
    /// Candidate frame, to be validated by the codec.
    Framed(&'a str),
}

/// Classify a line by the token marker. Containment wins over framing.
pub fn classify<'a>(line: &'a str, token_marker: &str) -> LineKind<'a> {
    if line.contains(token_marker) {
        LineKind::Token(line)
    } else {
        LineKind::Framed(line)
    }
}

/// Strip trailing CR/LF characters from a raw serial line.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
