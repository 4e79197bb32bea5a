use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use railbus_bus::{Bridge, BridgeConfig, Subscription};
use railbus_command::parse_text;
use railbus_frame::Frame;
use railbus_transport::DEFAULT_BAUD_RATE;

use crate::exit::{bus_error, parse_error, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod console;
pub mod listen;
pub mod parse;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive operator console: type `b<block> s<speed>` lines.
    Console(ConsoleArgs),
    /// Send commands or raw bytes once.
    Send(SendArgs),
    /// Print inbound frames.
    Listen(ListenArgs),
    /// Parse commands offline and print the resulting frames.
    Parse(ParseArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    pub bridge: BridgeConfig,
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Console(args) => console::run(args, ctx),
        Command::Send(args) => send::run(args, ctx),
        Command::Listen(args) => listen::run(args, ctx),
        Command::Parse(args) => parse::run(args, ctx),
        Command::Version(args) => version::run(args, ctx),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial port (e.g. /dev/ttyUSB0, COM3).
    pub port: String,
    /// Line speed.
    #[arg(long, env = "RAILBUS_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    #[command(flatten)]
    pub port: PortArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Operator command, e.g. "b2 s120". Repeat for several.
    #[arg(
        long = "command",
        short = 'c',
        value_name = "TEXT",
        required_unless_present = "hex",
        conflicts_with = "hex"
    )]
    pub commands: Vec<String>,
    /// Raw header and payload bytes in hex, e.g. "01 00 41 02 78".
    #[arg(long)]
    pub hex: Option<String>,
    /// Wait for one inbound frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the queue to drain and, with --wait, for a
    /// reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// One command per argument, e.g. "b0 s50".
    #[arg(required = true)]
    pub commands: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build provenance and defaults.
    #[arg(long)]
    pub extended: bool,
}

/// Parse each operator line into frames, in order.
///
/// A line is one command; the terminating newline is implied.
pub fn frames_from_commands(commands: &[String]) -> CliResult<Vec<Frame>> {
    let mut frames = Vec::new();
    for (index, command) in commands.iter().enumerate() {
        let line = format!("{}\n", command.trim_end_matches(['\r', '\n']));
        let parsed = parse_text(&line)
            .map_err(|err| parse_error(&format!("command {} ({command:?})", index + 1), err))?;
        frames.extend(parsed);
    }
    Ok(frames)
}

/// A closed bridge carrying the shared settings.
pub fn new_bridge(ctx: &Context) -> Bridge {
    Bridge::with_config(ctx.bridge.clone())
}

/// Open `bridge` on the requested port.
pub fn open_bridge(bridge: &mut Bridge, args: &PortArgs) -> CliResult<()> {
    bridge
        .open(&args.port, args.baud)
        .map_err(|err| bus_error("open failed", err))
}

/// Route every inbound frame into a channel.
pub fn forward_incoming(bridge: &Bridge) -> (Subscription, Receiver<Frame>) {
    let (tx, rx) = mpsc::channel();
    let sub = bridge.subscribe(move |frame| {
        tx.send(frame.clone())?;
        Ok(())
    });
    (sub, rx)
}

/// Wait until the worker has taken every queued frame.
pub fn drain_outgoing(bridge: &Bridge, timeout: Duration) -> CliResult<()> {
    let start = Instant::now();
    while bridge.outgoing_count() > 0 {
        if start.elapsed() >= timeout {
            return Err(CliError::new(
                TIMEOUT,
                format!(
                    "{} frame(s) still queued after {timeout:?}",
                    bridge.outgoing_count()
                ),
            ));
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
