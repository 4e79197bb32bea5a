#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

const MISSING_PORT: &str = "/dev/railbus-no-such-port";

fn railbus(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_railbus"))
        .args(args)
        .env_remove("RAILBUS_BAUD")
        .env_remove("RAILBUS_POLL_INTERVAL")
        .env_remove("RAILBUS_FANOUT_PERIOD")
        .output()
        .expect("railbus binary should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn version_prints_package_version() {
    let output = railbus(&["version"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        format!("railbus {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_timing_defaults() {
    let output = railbus(&["version", "--extended", "--fanout-period", "250ms"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("poll_interval: 100ms"), "{text}");
    assert!(text.contains("fanout_period: 250ms"), "{text}");
}

#[test]
fn parse_broadcast_emits_one_json_line_per_block() {
    let output = railbus(&["parse", "--format", "json", "b0 s50"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();
    assert_eq!(lines.len(), 4);

    for (line, block) in lines.iter().zip(1u8..) {
        assert_eq!(line["message"], "BLOCK_SPEED");
        assert_eq!(line["node_id"], 1);
        assert_eq!(line["message_id"], 0x41);
        assert_eq!(line["payload"], format!("{block:02X} 32"));
        assert_eq!(line["source"], "parse");
    }
}

#[test]
fn parse_raw_writes_wire_bytes() {
    let output = railbus(&["parse", "--format", "raw", "b3 s7"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(output.stdout, vec![0x01, 0x00, 0x41, 0x03, 0x07, 0xFF]);
}

#[test]
fn parse_rejects_bad_command_with_usage_code() {
    let output = railbus(&["parse", "b1 s1", "b2 q"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("command 2"), "{}", stderr(&output));
    assert!(stdout(&output).is_empty());
}

#[test]
fn send_rejects_bad_command_before_opening_port() {
    let output = railbus(&["send", MISSING_PORT, "--command", "b1 s999"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!stderr(&output).contains("open failed"), "{}", stderr(&output));
}

#[test]
fn send_to_missing_port_is_transport_error() {
    let output = railbus(&["send", MISSING_PORT, "--command", "b1 s10"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("open failed"), "{}", stderr(&output));
}

#[test]
fn invalid_duration_is_usage_error() {
    let output = railbus(&["version", "--poll-interval", "soon"]);
    assert_eq!(output.status.code(), Some(64));
}
