use railbus_frame::{encode_frame, Frame, Header, HEADER_SIZE, SENTINEL};
use tracing::info;

use crate::cmd::{
    drain_outgoing, forward_incoming, frames_from_commands, new_bridge, open_bridge,
    parse_duration, Context, SendArgs,
};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT, USAGE};
use crate::output::print_frame;

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let frames = match &args.hex {
        Some(hex) => vec![frame_from_hex(hex)?],
        None => frames_from_commands(&args.commands)?,
    };
    if frames.is_empty() && !args.wait {
        info!("no complete command to send");
        return Ok(SUCCESS);
    }

    let mut bridge = new_bridge(ctx);
    let replies = args.wait.then(|| forward_incoming(&bridge));
    open_bridge(&mut bridge, &args.port)?;

    let count = frames.len();
    bridge.send_all(frames);
    drain_outgoing(&bridge, wait_timeout)?;
    info!(count, port = %args.port.port, "frames sent");

    if let Some((_subscription, rx)) = replies {
        let frame = rx.recv_timeout(wait_timeout).map_err(|_| {
            CliError::new(TIMEOUT, format!("no reply within {wait_timeout:?}"))
        })?;
        print_frame(&frame, &args.port.port, ctx.format);
    }

    bridge.close();
    Ok(SUCCESS)
}

/// Build a wire-ready frame from hex header and payload bytes.
///
/// Whitespace, `:` and `,` separators are ignored. The sentinel is
/// appended and must not appear in the input.
fn frame_from_hex(input: &str) -> CliResult<Frame> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CliError::new(
            USAGE,
            format!("--hex is not valid hex: unexpected {bad:?}"),
        ));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "--hex needs an even number of digits"));
    }

    let bytes = (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))?;

    if bytes.len() < HEADER_SIZE {
        return Err(CliError::new(
            DATA_INVALID,
            format!("--hex needs at least {HEADER_SIZE} header bytes"),
        ));
    }
    if bytes.contains(&SENTINEL) {
        return Err(CliError::new(
            DATA_INVALID,
            "--hex must not contain the 0xFF end-of-message byte",
        ));
    }

    let header = Header::new(bytes[0], bytes[1], bytes[2]);
    Ok(encode_frame(header, &bytes[HEADER_SIZE..]))
}
