mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use railbus_bus::{BridgeConfig, PumpConfig, WorkerConfig};

use crate::cmd::{parse_duration, Command, Context};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "railbus", version, about = "Serial bridge to model-railway block controllers")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Idle sleep of the transport worker (e.g. 100ms).
    #[arg(
        long,
        value_name = "DURATION",
        env = "RAILBUS_POLL_INTERVAL",
        default_value = "100ms",
        global = true
    )]
    poll_interval: String,

    /// Period of subscriber fan-out (e.g. 200ms).
    #[arg(
        long,
        value_name = "DURATION",
        env = "RAILBUS_FANOUT_PERIOD",
        default_value = "200ms",
        global = true
    )]
    fanout_period: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn bridge_config(&self) -> CliResult<BridgeConfig> {
        Ok(BridgeConfig {
            worker: WorkerConfig {
                poll_interval: parse_duration(&self.poll_interval)?,
                ..WorkerConfig::default()
            },
            pump: PumpConfig {
                period: parse_duration(&self.fanout_period)?,
            },
            ..BridgeConfig::default()
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = cli.bridge_config().and_then(|bridge| {
        let ctx = Context {
            format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
            bridge,
        };
        cmd::run(cli.command, &ctx)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
