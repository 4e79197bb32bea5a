use crate::cmd::{frames_from_commands, Context, ParseArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::print_frames;

pub fn run(args: ParseArgs, ctx: &Context) -> CliResult<i32> {
    let frames = frames_from_commands(&args.commands)?;
    print_frames(&frames, "parse", ctx.format);
    Ok(SUCCESS)
}
