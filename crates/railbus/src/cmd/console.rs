use std::io::{self, BufRead};
use std::time::Duration;

use railbus_command::{CommandParser, ParseError};
use railbus_frame::Frame;
use tracing::debug;

use crate::cmd::{drain_outgoing, new_bridge, open_bridge, ConsoleArgs, Context};
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::print_frame;

const DRAIN_ON_EXIT: Duration = Duration::from_secs(2);

pub fn run(args: ConsoleArgs, ctx: &Context) -> CliResult<i32> {
    let mut bridge = new_bridge(ctx);
    let source = args.port.port.clone();
    let format = ctx.format;
    let _printer = bridge.subscribe(move |frame| {
        print_frame(frame, &source, format);
        Ok(())
    });
    open_bridge(&mut bridge, &args.port)?;

    eprintln!(
        "railbus console on {} at {} baud. Type b<block> s<speed>, x aborts a line, Ctrl-D quits.",
        args.port.port, args.port.baud
    );

    let mut parser = CommandParser::new();
    for line in io::stdin().lock().lines() {
        let line = line.map_err(|err| io_error("read stdin failed", err))?;
        match feed_line(&mut parser, &line) {
            Ok(frames) if frames.is_empty() => {}
            Ok(frames) => {
                debug!(count = frames.len(), "queueing operator frames");
                bridge.send_all(frames);
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }

    drain_outgoing(&bridge, DRAIN_ON_EXIT)?;
    bridge.close();
    Ok(SUCCESS)
}

/// Feed one operator line, newline included, through the parser.
///
/// Completed commands are collected and the parser cleared after each. On a
/// syntax error the rest of the line is skipped and the parser cleared.
fn feed_line(parser: &mut CommandParser, line: &str) -> Result<Vec<Frame>, ParseError> {
    let mut frames = Vec::new();
    for (position, ch) in line.chars().chain(std::iter::once('\n')).enumerate() {
        parser.parse(ch);
        if parser.is_error() {
            parser.clear();
            return Err(ParseError::Syntax {
                position,
                found: ch,
            });
        }
        if let Some(data) = parser.command_data() {
            frames.extend(data);
            parser.clear();
        }
    }
    Ok(frames)
}
