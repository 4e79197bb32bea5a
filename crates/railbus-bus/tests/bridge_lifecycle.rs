//! End-to-end bridge behaviour over an in-memory link.

use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use railbus_bus::{Bridge, BridgeConfig, PumpConfig, WorkerConfig};
use railbus_command::parse_text;
use railbus_frame::{block_speed, split_frames, Frame, BLOCK_OCCUPATION};
use railbus_transport::memory::{self, MemoryLink};

fn fast_bridge() -> Bridge {
    Bridge::with_config(BridgeConfig {
        worker: WorkerConfig {
            poll_interval: Duration::from_millis(5),
            ..WorkerConfig::default()
        },
        pump: PumpConfig {
            period: Duration::from_millis(10),
        },
        ..BridgeConfig::default()
    })
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Read everything the host wrote until `count` frames have arrived.
fn read_frames(device: &mut MemoryLink, count: usize) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut tail = Vec::new();
    let mut buf = [0u8; 64];

    let done = wait_until(Duration::from_secs(2), || {
        match device.read(&mut buf) {
            Ok(n) if n > 0 => {
                let (new_frames, rest) = split_frames(&tail, &buf[..n]);
                frames.extend(new_frames);
                tail = rest.to_vec();
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => panic!("device read failed: {err}"),
        }
        frames.len() >= count
    });
    assert!(done, "expected {count} frames, got {}", frames.len());
    frames
}

#[test]
fn parsed_commands_reach_the_device() {
    let (host, mut device) = memory::pair("loop");
    let mut bridge = fast_bridge();
    bridge.attach(Box::new(host)).unwrap();

    bridge.send_all(parse_text("b0 s7\nb3 s200\n").unwrap());

    let frames = read_frames(&mut device, 5);
    let bodies: Vec<&[u8]> = frames.iter().map(Frame::as_bytes).collect();
    assert_eq!(
        bodies,
        vec![
            &[1, 0, 0x41, 1, 7][..],
            &[1, 0, 0x41, 2, 7][..],
            &[1, 0, 0x41, 3, 7][..],
            &[1, 0, 0x41, 4, 7][..],
            &[1, 0, 0x41, 3, 200][..],
        ]
    );
    bridge.close();
}

#[test]
fn subscribers_see_device_reports_in_order() {
    let (host, mut device) = memory::pair("loop");
    let mut bridge = fast_bridge();
    let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let _sub = bridge.subscribe(move |frame| {
        sink.lock().unwrap().push(frame.as_bytes().to_vec());
        Ok(())
    });
    bridge.attach(Box::new(host)).unwrap();

    // Split across writes, including a frame cut mid-header.
    device.write_all(&[1, 0, BLOCK_OCCUPATION, 2, 1, 0xFF, 1]).unwrap();
    thread::sleep(Duration::from_millis(20));
    device.write_all(&[0, BLOCK_OCCUPATION, 2, 0, 0xFF]).unwrap();

    assert!(wait_until(Duration::from_secs(2), || seen.lock().unwrap().len() == 2));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            vec![1, 0, BLOCK_OCCUPATION, 2, 1],
            vec![1, 0, BLOCK_OCCUPATION, 2, 0],
        ]
    );
    assert_eq!(bridge.incoming_count(), 0);
}

#[test]
fn failing_subscriber_does_not_stop_delivery() {
    let (host, mut device) = memory::pair("loop");
    let mut bridge = fast_bridge();
    let count = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&count);

    let _bad = bridge.subscribe(|_| Err("rejected".into()));
    let _good = bridge.subscribe(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    bridge.attach(Box::new(host)).unwrap();

    for _ in 0..3 {
        device.write_all(&[1, 0, BLOCK_OCCUPATION, 1, 1, 0xFF]).unwrap();
    }
    assert!(wait_until(Duration::from_secs(2), || *count.lock().unwrap() == 3));
    assert!(bridge.is_open());
}

#[test]
fn close_stops_io_and_keeps_queued_frames() {
    let (host, mut device) = memory::pair("loop");
    let mut bridge = fast_bridge();
    bridge.attach(Box::new(host)).unwrap();
    assert_eq!(bridge.link_name(), Some("loop:host"));

    bridge.close();
    bridge.close();
    assert!(!bridge.is_open());

    // The host end was dropped with the worker.
    assert!(!device.is_connected());

    bridge.send(block_speed(1, 1));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(bridge.outgoing_count(), 1);
}

#[test]
fn reattach_delivers_frames_queued_while_closed() {
    let mut bridge = fast_bridge();

    let (first, _first_device) = memory::pair("first");
    bridge.attach(Box::new(first)).unwrap();
    bridge.close();

    bridge.send(block_speed(4, 44));

    let (second, mut second_device) = memory::pair("second");
    bridge.attach(Box::new(second)).unwrap();
    assert_eq!(bridge.link_name(), Some("second:host"));

    let frames = read_frames(&mut second_device, 1);
    assert_eq!(frames[0].as_bytes(), &[1, 0, 0x41, 4, 44]);
}

#[test]
fn direct_receive_without_subscribers() {
    let (host, mut device) = memory::pair("loop");
    let mut bridge = Bridge::with_config(BridgeConfig {
        worker: WorkerConfig {
            poll_interval: Duration::from_millis(5),
            ..WorkerConfig::default()
        },
        // Slow pump so the frame is still queued when polled.
        pump: PumpConfig {
            period: Duration::from_secs(60),
        },
        ..BridgeConfig::default()
    });
    bridge.attach(Box::new(host)).unwrap();

    // Let the immediate first pump tick pass before anything arrives.
    thread::sleep(Duration::from_millis(50));
    device.write_all(&[0, 0, 1, 0xFF]).unwrap();

    assert!(wait_until(Duration::from_secs(2), || bridge.has_incoming()));
    let frame = bridge.try_receive().unwrap();
    assert_eq!(frame.as_bytes(), &[0, 0, 1]);
    assert!(frame.header().unwrap().is_global());
}
