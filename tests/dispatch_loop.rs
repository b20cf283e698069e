mod common;

use std::io;
use std::time::Duration;

use common::{fast_token_settings, frame_line, MemorySink, ScriptedRemote};
use rmsbridge::bridge::{Bridge, BridgeSettings, LineOutcome, Route, Router};
use rmsbridge::errors::{FrameError, LineError, TokenError};
use rmsbridge::protocol::{Command, FrameFormat};
use rmsbridge::serial::FakeSerial;
use rmsbridge::shutdown::Shutdown;
use rmsbridge::storage::SnapshotFile;
use serde_json::json;

fn settings() -> BridgeSettings {
    BridgeSettings {
        poll_interval: Duration::from_millis(1),
        token: fast_token_settings(),
        ..BridgeSettings::default()
    }
}

#[test]
fn token_marker_routes_regardless_of_field_count() {
    let router = Router::new(FrameFormat::default(), "token");
    for line in [
        r#"{"token": "abc"}"#,
        "ESP:> $_TOKN_token_*",
        "token",
        "ESP:> $_SENS_5_token_1_*",
    ] {
        assert_eq!(router.inspect(line).unwrap(), Route::Token(line.to_string()));
    }
    assert!(matches!(
        router.inspect("ESP:> $_TOKN_5_*"),
        Err(LineError::Frame(FrameError::Structure { found: 4 }))
    ));
}

#[test]
fn framed_tokn_routes_its_payload() {
    let router = Router::new(FrameFormat::default(), "token");
    let line = frame_line("TOKN", r#"{"id":7}"#);
    assert_eq!(
        router.inspect(&line).unwrap(),
        Route::Token(r#"{"id":7}"#.to_string())
    );
}

#[tokio::test]
async fn malformed_token_line_is_a_decode_error_not_a_frame_error() {
    let (_handle, shutdown) = Shutdown::channel();
    let mut bridge = Bridge::new(
        FakeSerial::default(),
        MemorySink::default(),
        ScriptedRemote::replying(json!({})),
        settings(),
        shutdown,
    );
    let err = bridge.handle_line("ESP:> $_TOKN_token_*\n").await.unwrap_err();
    assert!(matches!(err, LineError::Token(TokenError::Decode(_))));
    assert_eq!(bridge.remote().calls(), 0);
}

#[tokio::test]
async fn poll_once_reports_idle_and_blank_lines() {
    let (_handle, shutdown) = Shutdown::channel();
    let mut bridge = Bridge::new(
        FakeSerial::new(["\r\n"]),
        MemorySink::default(),
        ScriptedRemote::replying(json!({})),
        settings(),
        shutdown,
    );
    assert!(matches!(
        bridge.poll_once().await.unwrap(),
        Some(Ok(LineOutcome::Empty))
    ));
    assert!(bridge.poll_once().await.unwrap().is_none());
}

#[tokio::test]
async fn run_processes_every_line_and_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("RMS_INFO.txt");

    let mut serial = FakeSerial::new([
        "\n".to_string(),
        "boot: rack monitor v2\r\n".to_string(),
        format!("{}\r\n", frame_line("INFO", "12.1~5.02~3.29~41.5")),
        format!("{}\r\n", frame_line("TOKN", r#"{"id":7}"#)),
        // Board echoes the relayed response
        r#"{"id": 7}"#.to_string(),
        "ESP:> $_INFO_7_1~2~3~4_1_*\r\n".to_string(),
    ]);
    serial.push_error(io::ErrorKind::TimedOut);
    serial.push_line(format!("{}\r\n", frame_line("SENS", "open~closed~idle")));

    let (handle, shutdown) = Shutdown::channel();
    let mut bridge = Bridge::new(
        serial,
        SnapshotFile::new(&snapshot_path),
        ScriptedRemote::replying(json!({"id": 7})),
        settings(),
        shutdown,
    );

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.trigger();
    });
    tokio::time::timeout(Duration::from_secs(10), bridge.run())
        .await
        .expect("run should return after shutdown");

    assert_eq!(bridge.serial().remaining(), 0);
    assert_eq!(
        bridge.remote().requests(),
        vec![json!({"id": 7})],
        "framed TOKN payload is what gets posted"
    );
    assert_eq!(bridge.serial().written_text(), vec![r#"{"id": 7}"#.to_string()]);
    assert_eq!(
        std::fs::read_to_string(&snapshot_path).unwrap(),
        "$gate:open~rack:closed~pir:idle~voltage12v:12.1~voltage5v:5.02~voltage3_3v:3.29~boardTemp:41.5*"
    );
}

#[tokio::test]
async fn run_returns_at_once_when_already_shut_down() {
    let (handle, shutdown) = Shutdown::channel();
    handle.trigger();
    let mut bridge = Bridge::new(
        FakeSerial::new([frame_line("SENS", "open~closed~idle")]),
        MemorySink::default(),
        ScriptedRemote::replying(json!({})),
        settings(),
        shutdown,
    );
    tokio::time::timeout(Duration::from_secs(5), bridge.run())
        .await
        .expect("run should not wait");
    assert_eq!(bridge.serial().remaining(), 1);
    assert!(bridge.sink().flushes.is_empty());
}

#[test]
fn command_ids_match_wire_format() {
    assert_eq!(
        Command::ALL.map(Command::id),
        ["INFO", "SENS", "TOKN"]
    );
}
