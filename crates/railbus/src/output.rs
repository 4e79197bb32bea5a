use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use railbus_frame::{message_name, Frame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
struct FrameOutput<'a> {
    node_id: Option<u8>,
    device_id: Option<u8>,
    message_id: Option<u8>,
    message: &'static str,
    payload: String,
    size: usize,
    source: &'a str,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &Frame, source: &'a str) -> Self {
        let header = frame.header();
        Self {
            node_id: header.map(|h| h.node_id),
            device_id: header.map(|h| h.device_id),
            message_id: header.map(|h| h.message_id),
            message: header.as_ref().map_or("TRUNCATED", message_name),
            payload: hex(frame.payload()),
            size: frame.len(),
            source,
            timestamp: now_unix_seconds(),
        }
    }
}

/// Print one frame on stdout.
pub fn print_frame(frame: &Frame, source: &str, format: OutputFormat) {
    print_frames(std::slice::from_ref(frame), source, format);
}

/// Print frames on stdout. Table output groups them into a single table.
pub fn print_frames(frames: &[Frame], source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                let out = FrameOutput::new(frame, source);
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            if frames.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NODE", "DEVICE", "MESSAGE", "PAYLOAD", "SOURCE"]);
            for frame in frames {
                let out = FrameOutput::new(frame, source);
                table.add_row(vec![
                    id_cell(out.node_id),
                    id_cell(out.device_id),
                    out.message.to_string(),
                    out.payload,
                    source.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in frames {
                println!("{}", pretty_line(frame, source));
            }
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout().lock();
            for frame in frames {
                let _ = out.write_all(frame.as_bytes());
            }
            let _ = out.flush();
        }
    }
}

fn pretty_line(frame: &Frame, source: &str) -> String {
    match frame.header() {
        Some(header) => format!(
            "{source}: node={} device={} {} [{}]",
            header.node_id,
            header.device_id,
            message_name(&header),
            hex(frame.payload())
        ),
        None => format!("{source}: truncated [{}]", frame.to_hex()),
    }
}

fn id_cell(id: Option<u8>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
