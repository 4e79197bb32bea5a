//! Drive a bridge against a simulated block controller, no hardware needed.
//!
//! Run with:
//!   cargo run -p railbus --example loopback
//!
//! The simulator acknowledges every block-speed command with a
//! block-occupation report for the same block.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use railbus::bus::Bridge;
use railbus::command::parse_text;
use railbus::frame::{
    encode_frame, message_name, split_frames, Header, BLOCK_OCCUPATION, BLOCK_SPEED,
};
use railbus::transport::memory::{self, MemoryLink};

fn simulate_controller(mut device: MemoryLink, running: Arc<AtomicBool>) {
    let mut tail = Vec::new();
    let mut buf = [0u8; 256];

    while running.load(Ordering::SeqCst) {
        let n = match device.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(5));
                continue;
            }
            Err(err) => {
                eprintln!("controller read failed: {err}");
                break;
            }
        };

        let (frames, rest) = split_frames(&tail, &buf[..n]);
        tail = rest.to_vec();

        for frame in frames {
            let Some(header) = frame.header() else {
                continue;
            };
            if header.message_id != BLOCK_SPEED {
                continue;
            }
            let block = frame.payload().first().copied().unwrap_or_default();
            let report = encode_frame(Header::new(1, 0, BLOCK_OCCUPATION), &[block, 1]);
            if device.write_all(report.as_bytes()).is_err() {
                return;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host, device) = memory::pair("loopback");
    let running = Arc::new(AtomicBool::new(true));
    let controller = {
        let running = Arc::clone(&running);
        thread::spawn(move || simulate_controller(device, running))
    };

    let mut bridge = Bridge::new();
    let _printer = bridge.subscribe(|frame| {
        if let Some(header) = frame.header() {
            println!("<- {} [{}]", message_name(&header), frame.to_hex());
        }
        Ok(())
    });
    bridge.attach(Box::new(host))?;

    let frames = parse_text("b0 s60\nb2 s120\n")?;
    for frame in &frames {
        println!("-> {}", frame.to_hex());
    }
    bridge.send_all(frames);

    thread::sleep(Duration::from_secs(1));
    bridge.close();

    running.store(false, Ordering::SeqCst);
    let _ = controller.join();
    Ok(())
}
