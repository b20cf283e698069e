//! Six-field ASCII frame codec.
//!
//! Frames on the serial link look like:
//!
//! ```text
//! ESP:> $_INFO_7_1~2~3~4_151847493_*
//! └start┘ └cmd┘ │ └payload┘ └adler┘ └end
//!               └ payload length (chars)
//! ```
//!
//! Validation short-circuits on the first failing check and never partially
//! accepts a frame.
use std::fmt;

use super::checksum::adler32;
use crate::errors::FrameError;

/// Separator between the six frame fields.
pub const FIELD_DELIMITER: char = '_';
/// Number of fields in a well-formed frame.
pub const FIELD_COUNT: usize = 6;

pub const DEFAULT_START_MARKER: &str = "ESP:> $";
pub const DEFAULT_END_MARKER: &str = "*";

/// Command identifiers understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Numeric quad: supply voltages and board temperature.
    Info,
    /// Alpha triplet: gate, rack and PIR states.
    Sens,
    /// Framed token exchange.
    Tokn,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Info, Command::Sens, Command::Tokn];

    /// Wire identifier of the command.
    pub fn id(self) -> &'static str {
        match self {
            Command::Info => "INFO",
            Command::Sens => "SENS",
            Command::Tokn => "TOKN",
        }
    }

    /// Resolve a wire identifier. Matching is exact (case-sensitive).
    pub fn from_id(id: &str) -> Option<Command> {
        match id {
            "INFO" => Some(Command::Info),
            "SENS" => Some(Command::Sens),
            "TOKN" => Some(Command::Tokn),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A fully validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub declared_len: u64,
    pub payload: String,
    pub declared_checksum: u64,
}

/// Start/end sentinels for the frame codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFormat {
    pub start_marker: String,
    pub end_marker: String,
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
        }
    }
}

impl FrameFormat {
    pub fn new(start_marker: impl Into<String>, end_marker: impl Into<String>) -> Self {
        Self {
            start_marker: start_marker.into(),
            end_marker: end_marker.into(),
        }
    }

    /// Parse and validate one line (line endings already stripped).
    pub fn parse(&self, line: &str) -> Result<Frame, FrameError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(FrameError::Structure {
                found: fields.len(),
            });
        }

        if fields[0] != self.start_marker || fields[5] != self.end_marker {
            return Err(FrameError::Markers);
        }

        let declared_len = parse_decimal(fields[2])?;
        let declared_checksum = parse_decimal(fields[4])?;

        let payload = fields[3];
        let actual = payload.chars().count();
        if declared_len != actual as u64 {
            return Err(FrameError::LengthMismatch {
                declared: declared_len,
                actual,
            });
        }

        if !payload.is_ascii() {
            return Err(FrameError::NonAsciiPayload);
        }
        let computed = adler32(payload.as_bytes());
        if declared_checksum != u64::from(computed) {
            return Err(FrameError::ChecksumMismatch {
                declared: declared_checksum,
                computed,
            });
        }

        let command = Command::from_id(fields[1])
            .ok_or_else(|| FrameError::UnknownCommand(fields[1].to_string()))?;

        Ok(Frame {
            command,
            declared_len,
            payload: payload.to_string(),
            declared_checksum,
        })
    }

    /// Build the wire line for `payload`, computing length and checksum.
    ///
    /// Rejects payloads that could never parse back: ones containing the field
    /// delimiter or non-ASCII characters.
    pub fn encode(&self, command: Command, payload: &str) -> Result<String, FrameError> {
        let embedded = payload.matches(FIELD_DELIMITER).count();
        if embedded > 0 {
            return Err(FrameError::Structure {
                found: FIELD_COUNT + embedded,
            });
        }
        if !payload.is_ascii() {
            return Err(FrameError::NonAsciiPayload);
        }
        Ok(format!(
            "{start}{d}{cmd}{d}{len}{d}{payload}{d}{sum}{d}{end}",
            start = self.start_marker,
            cmd = command.id(),
            len = payload.len(),
            sum = adler32(payload.as_bytes()),
            end = self.end_marker,
            d = FIELD_DELIMITER,
        ))
    }
}

/// Non-empty run of ASCII digits. Values past `u64::MAX` saturate: no payload
/// length or Adler-32 can reach it, so an oversized field fails the later
/// length or checksum comparison instead of the type check.
fn parse_decimal(field: &str) -> Result<u64, FrameError> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FrameError::FieldType);
    }
    Ok(field.parse::<u64>().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_info_frame() {
        let fmt = FrameFormat::default();
        let frame = fmt.parse("ESP:> $_INFO_7_1~2~3~4_151847493_*").unwrap();
        assert_eq!(frame.command, Command::Info);
        assert_eq!(frame.payload, "1~2~3~4");
        assert_eq!(frame.declared_len, 7);
        assert_eq!(frame.declared_checksum, 151_847_493);
    }

    #[test]
    fn checks_run_in_order() {
        let fmt = FrameFormat::default();
        // bad markers and bad length: markers reported first
        assert_eq!(
            fmt.parse("$_INFO_9_1~2~3~4_151847493_*"),
            Err(FrameError::Markers)
        );
        // bad length and bad checksum: length reported first
        assert!(matches!(
            fmt.parse("ESP:> $_INFO_8_1~2~3~4_1_*"),
            Err(FrameError::LengthMismatch {
                declared: 8,
                actual: 7
            })
        ));
        // unknown command is only reported once everything else checks out
        assert!(matches!(
            fmt.parse("ESP:> $_XXXX_7_1~2~3~4_1_*"),
            Err(FrameError::ChecksumMismatch { .. })
        ));
        assert_eq!(
            fmt.parse("ESP:> $_XXXX_7_1~2~3~4_151847493_*"),
            Err(FrameError::UnknownCommand("XXXX".into()))
        );
    }

    #[test]
    fn numeric_fields_reject_signs_and_blanks() {
        let fmt = FrameFormat::default();
        for line in [
            "ESP:> $_INFO_-7_1~2~3~4_151847493_*",
            "ESP:> $_INFO__1~2~3~4_151847493_*",
            "ESP:> $_INFO_7_1~2~3~4_0x10_*",
        ] {
            assert_eq!(fmt.parse(line), Err(FrameError::FieldType), "{line}");
        }
    }

    #[test]
    fn oversized_digit_fields_fail_the_comparison_not_the_type_check() {
        let fmt = FrameFormat::default();
        assert_eq!(
            fmt.parse("ESP:> $_INFO_99999999999999999999999_1~2~3~4_151847493_*"),
            Err(FrameError::LengthMismatch {
                declared: u64::MAX,
                actual: 7
            })
        );
        assert_eq!(
            fmt.parse("ESP:> $_INFO_7_1~2~3~4_99999999999999999999999_*"),
            Err(FrameError::ChecksumMismatch {
                declared: u64::MAX,
                computed: 151_847_493
            })
        );
    }

    #[test]
    fn encode_refuses_unparseable_payloads() {
        let fmt = FrameFormat::default();
        assert_eq!(
            fmt.encode(Command::Sens, "a_b"),
            Err(FrameError::Structure { found: 7 })
        );
        assert_eq!(
            fmt.encode(Command::Sens, "café"),
            Err(FrameError::NonAsciiPayload)
        );
    }
}
