use crate::cmd::{Context, VersionArgs};
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs, ctx: &Context) -> CliResult<i32> {
    if !args.extended {
        println!("railbus {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: railbus");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("RAILBUS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("serial_defaults: {}", describe_serial(ctx));
    println!("poll_interval: {:?}", ctx.bridge.worker.poll_interval);
    println!("fanout_period: {:?}", ctx.bridge.pump.period);
    println!("max_pending: {}", ctx.bridge.worker.frame.max_pending);

    Ok(SUCCESS)
}

fn describe_serial(ctx: &Context) -> String {
    let serial = &ctx.bridge.serial;
    format!(
        "{} baud, {} data bits, parity {:?}, {} stop bit(s)",
        serial.baud_rate, serial.data_bits, serial.parity, serial.stop_bits
    )
}
