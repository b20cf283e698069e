mod common;

use rmsbridge::errors::FrameError;
use rmsbridge::protocol::{adler32, Command, FrameFormat};

#[test]
fn encoded_frames_parse_back_with_same_length_and_checksum() {
    let fmt = FrameFormat::default();
    for (cmd, payload) in [
        (Command::Info, "12.1~5.02~3.29~41.5"),
        (Command::Sens, "open~closed~idle"),
        (Command::Tokn, r#"{"id":7}"#),
        (Command::Info, ""),
    ] {
        let line = fmt.encode(cmd, payload).unwrap();
        let frame = fmt.parse(&line).unwrap();
        assert_eq!(frame.command, cmd);
        assert_eq!(frame.payload, payload);
        assert_eq!(frame.declared_len, payload.len() as u64);
        assert_eq!(frame.declared_checksum, u64::from(adler32(payload.as_bytes())));
        // Encoder agrees with an independently built line
        assert_eq!(line, common::frame_line(cmd.id(), payload));
    }
}

#[test]
fn checksum_is_deterministic() {
    let data = b"open~closed~idle";
    let first = adler32(data);
    for _ in 0..10 {
        assert_eq!(adler32(data), first);
    }
    assert_ne!(adler32(b"open~closed~idlf"), first);
}

#[test]
fn reference_info_frame_parses() {
    let line = format!("ESP:> $_INFO_7_1~2~3~4_{}_*", adler32(b"1~2~3~4"));
    let frame = common::codec().parse(&line).unwrap();
    assert_eq!(frame.command, Command::Info);
    assert_eq!(frame.payload, "1~2~3~4");
}

#[test]
fn flipped_payload_character_fails_checksum() {
    let line = format!("ESP:> $_INFO_7_1~2~9~4_{}_*", adler32(b"1~2~3~4"));
    match common::codec().parse(&line) {
        Err(FrameError::ChecksumMismatch { declared, computed }) => {
            assert_eq!(declared, u64::from(adler32(b"1~2~3~4")));
            assert_eq!(computed, adler32(b"1~2~9~4"));
        }
        other => panic!("expected checksum mismatch, got {:?}", other),
    }
}

#[test]
fn structural_and_marker_failures() {
    let fmt = common::codec();
    assert_eq!(
        fmt.parse("ESP:> $_INFO_7_1~2~3~4_*"),
        Err(FrameError::Structure { found: 5 })
    );
    assert_eq!(
        fmt.parse("ESP:> $_INFO_7_1~2_3~4_151847493_*"),
        Err(FrameError::Structure { found: 7 })
    );
    assert_eq!(
        fmt.parse("ESP:>$_INFO_7_1~2~3~4_151847493_*"),
        Err(FrameError::Markers)
    );
    assert_eq!(
        fmt.parse("ESP:> $_INFO_7_1~2~3~4_151847493_#"),
        Err(FrameError::Markers)
    );
}

#[test]
fn numeric_fields_must_be_plain_digits() {
    let fmt = common::codec();
    for line in [
        "ESP:> $_INFO_seven_1~2~3~4_151847493_*",
        "ESP:> $_INFO_-7_1~2~3~4_151847493_*",
        "ESP:> $_INFO__1~2~3~4_151847493_*",
        "ESP:> $_INFO_7_1~2~3~4_0x90D_*",
    ] {
        assert_eq!(fmt.parse(line), Err(FrameError::FieldType), "{line}");
    }
}

#[test]
fn oversized_checksum_is_a_mismatch() {
    assert!(matches!(
        common::codec().parse("ESP:> $_SENS_16_open~closed~idle_123456789012345678901234567890_*"),
        Err(FrameError::ChecksumMismatch { computed: 975_832_775, .. })
    ));
}

#[test]
fn length_is_checked_before_checksum() {
    assert_eq!(
        common::codec().parse("ESP:> $_INFO_8_1~2~3~4_1_*"),
        Err(FrameError::LengthMismatch {
            declared: 8,
            actual: 7
        })
    );
}

#[test]
fn non_ascii_payload_is_rejected() {
    // "café" is four characters, so the length check passes first
    assert_eq!(
        common::codec().parse("ESP:> $_SENS_4_café_1_*"),
        Err(FrameError::NonAsciiPayload)
    );
}

#[test]
fn unknown_command_is_the_last_check() {
    let line = common::frame_line("PING", "1~2~3~4");
    assert_eq!(
        common::codec().parse(&line),
        Err(FrameError::UnknownCommand("PING".to_string()))
    );
    let lower = common::frame_line("info", "1~2~3~4");
    assert!(matches!(
        common::codec().parse(&lower),
        Err(FrameError::UnknownCommand(_))
    ));
}

#[test]
fn custom_markers_are_honoured() {
    let fmt = FrameFormat::new("BOARD>", "#");
    let line = fmt.encode(Command::Sens, "open~open~open").unwrap();
    assert!(line.starts_with("BOARD>_SENS_14_"));
    assert!(line.ends_with("_#"));
    assert!(fmt.parse(&line).is_ok());
    assert_eq!(FrameFormat::default().parse(&line), Err(FrameError::Markers));
}

#[test]
fn encoder_refuses_unparsable_payloads() {
    let fmt = FrameFormat::default();
    assert!(matches!(
        fmt.encode(Command::Tokn, r#"{"a_b":1}"#),
        Err(FrameError::Structure { .. })
    ));
    assert_eq!(
        fmt.encode(Command::Sens, "ouvert~fermé~idle"),
        Err(FrameError::NonAsciiPayload)
    );
}
