use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::cmd::{forward_incoming, new_bridge, open_bridge, Context, ListenArgs};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::print_frame;

const SHUTDOWN_CHECK: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, ctx: &Context) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut bridge = new_bridge(ctx);
    let (_subscription, rx) = forward_incoming(&bridge);
    open_bridge(&mut bridge, &args.port)?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match rx.recv_timeout(SHUTDOWN_CHECK) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        print_frame(&frame, &args.port.port, ctx.format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    bridge.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
