//! Sensor snapshot and payload validation for the `INFO` and `SENS` commands.
//!
//! The snapshot holds seven labelled slots. The first three (gate, rack, PIR) are
//! owned by `SENS` as an [`AlphaTriplet`]; the last four (supply rails and board
//! temperature) are owned by `INFO` as a [`NumericQuad`]. An update to one record
//! never touches the other. Both are merged only when rendering for persistence.
use crate::errors::PayloadError;
use crate::protocol::PAYLOAD_DELIMITER;

/// Slot labels, in persisted order.
pub const LABELS: [&str; 7] = [
    "gate:",
    "rack:",
    "pir:",
    "voltage12v:",
    "voltage5v:",
    "voltage3_3v:",
    "boardTemp:",
];

/// Door/motion states reported by `SENS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlphaTriplet {
    pub gate: String,
    pub rack: String,
    pub pir: String,
}

impl AlphaTriplet {
    /// Parse `gate~rack~pir`; every part must be non-empty and alphabetic.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let [gate, rack, pir] = split_exact::<3>(payload)?;
        for (index, part) in [gate, rack, pir].into_iter().enumerate() {
            if !is_alphabetic(part) {
                return Err(PayloadError::NotAlphabetic {
                    index,
                    value: part.to_string(),
                });
            }
        }
        Ok(Self {
            gate: gate.to_string(),
            rack: rack.to_string(),
            pir: pir.to_string(),
        })
    }
}

/// Supply voltages and board temperature reported by `INFO`.
///
/// Values are kept as the board sent them so the persisted text is byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericQuad {
    pub voltage_12v: String,
    pub voltage_5v: String,
    pub voltage_3v3: String,
    pub board_temp: String,
}

impl NumericQuad {
    /// Parse `v12~v5~v3_3~temp`; every part must be a non-negative decimal.
    pub fn parse(payload: &str) -> Result<Self, PayloadError> {
        let [v12, v5, v3, temp] = split_exact::<4>(payload)?;
        for (index, part) in [v12, v5, v3, temp].into_iter().enumerate() {
            if !is_unsigned_decimal(part) {
                return Err(PayloadError::NotNumeric {
                    index,
                    value: part.to_string(),
                });
            }
        }
        Ok(Self {
            voltage_12v: v12.to_string(),
            voltage_5v: v5.to_string(),
            voltage_3v3: v3.to_string(),
            board_temp: temp.to_string(),
        })
    }
}

/// Latest known value of every tracked slot. Empty strings until first update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    pub states: AlphaTriplet,
    pub readings: NumericQuad,
}

impl SensorSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot values in label order.
    pub fn values(&self) -> [&str; 7] {
        [
            &self.states.gate,
            &self.states.rack,
            &self.states.pir,
            &self.readings.voltage_12v,
            &self.readings.voltage_5v,
            &self.readings.voltage_3v3,
            &self.readings.board_temp,
        ]
    }

    /// `(label, value)` pairs in persisted order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        LABELS.into_iter().zip(self.values())
    }

    /// Persisted text form: `$gate:open~rack:closed~...~boardTemp:41.5*`.
    ///
    /// Downstream readers parse this byte-for-byte; do not change the layout.
    pub fn render(&self) -> String {
        let body = self
            .entries()
            .map(|(label, value)| format!("{label}{value}"))
            .collect::<Vec<_>>()
            .join("~");
        format!("${body}*")
    }
}

fn split_exact<const N: usize>(payload: &str) -> Result<[&str; N], PayloadError> {
    let parts: Vec<&str> = payload.split(PAYLOAD_DELIMITER).collect();
    let found = parts.len();
    parts
        .try_into()
        .map_err(|_| PayloadError::PartCount { expected: N, found })
}

/// Digits with at most one decimal point (`3`, `3.5`, `3.`, `.5`); no sign or exponent.
fn is_unsigned_decimal(part: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in part.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

fn is_alphabetic(part: &str) -> bool {
    !part.is_empty() && part.chars().all(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_renders_bare_labels() {
        assert_eq!(
            SensorSnapshot::new().render(),
            "$gate:~rack:~pir:~voltage12v:~voltage5v:~voltage3_3v:~boardTemp:*"
        );
    }

    #[test]
    fn decimal_rule() {
        for ok in ["0", "12", "3.5", "3.", ".5", "007"] {
            assert!(is_unsigned_decimal(ok), "{ok}");
        }
        for bad in ["", ".", "-1", "+1", "1e3", "1.2.3", " 1", "x"] {
            assert!(!is_unsigned_decimal(bad), "{bad}");
        }
    }

    #[test]
    fn part_count_reports_what_was_found() {
        assert_eq!(
            NumericQuad::parse("1~2~3"),
            Err(PayloadError::PartCount {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(
            AlphaTriplet::parse("a~b~c~d"),
            Err(PayloadError::PartCount {
                expected: 3,
                found: 4
            })
        );
    }
}
