//! The transport worker: sole owner of the open link.
//!
//! One thread per open link alternates between draining inbound bytes into
//! the incoming queue and writing one outgoing frame. Passes repeat
//! back-to-back while either direction makes progress; otherwise the thread
//! sleeps for the poll interval. Driver change notifications are not used.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use railbus_frame::{write_frame, Frame, FrameError, FrameReader};
use railbus_transport::{Link, SerialConfig, SerialLink};
use tracing::{debug, trace, warn};

use crate::config::WorkerConfig;
use crate::error::{BusError, Result};
use crate::queue::MessageBus;

/// Owns at most one open link and the worker thread serving it.
pub struct Transport {
    bus: Arc<MessageBus>,
    config: WorkerConfig,
    worker: Option<Worker>,
}

struct Worker {
    name: String,
    stop: Sender<()>,
    handle: JoinHandle<Box<dyn Link>>,
}

impl Transport {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self::with_config(bus, WorkerConfig::default())
    }

    pub fn with_config(bus: Arc<MessageBus>, config: WorkerConfig) -> Self {
        Self {
            bus,
            config,
            worker: None,
        }
    }

    /// Open a serial port at `baud_rate` and start the worker.
    ///
    /// Any link already open is closed first. Open failures are returned
    /// to the caller; nothing is started in that case.
    pub fn open(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        self.open_with_config(port, &SerialConfig::with_baud_rate(baud_rate))
    }

    /// Open a serial port with explicit line settings and start the worker.
    pub fn open_with_config(&mut self, port: &str, serial: &SerialConfig) -> Result<()> {
        self.close();
        let link = SerialLink::open_with_config(port, serial)?;
        self.start(Box::new(link))
    }

    /// Start the worker on an already-connected link.
    pub fn attach(&mut self, link: Box<dyn Link>) -> Result<()> {
        self.close();
        self.start(link)
    }

    /// Stop the worker, wait for it to exit and release the link.
    ///
    /// No I/O happens on the link after this returns. Calling it when
    /// nothing is open is a no-op.
    pub fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        // A send error only means the thread already dropped its receiver.
        let _ = worker.stop.send(());
        match worker.handle.join() {
            Ok(link) => {
                debug!(link = %worker.name, "releasing link");
                drop(link);
            }
            Err(_) => warn!(link = %worker.name, "transport worker panicked"),
        }
    }

    pub fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    /// Name of the open link, if any.
    pub fn link_name(&self) -> Option<&str> {
        self.worker.as_ref().map(|w| w.name.as_str())
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    fn start(&mut self, link: Box<dyn Link>) -> Result<()> {
        let name = link.name().to_string();
        let (stop, stop_rx) = mpsc::channel();
        let bus = Arc::clone(&self.bus);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("railbus-io".to_string())
            .spawn(move || run(link, &bus, &config, &stop_rx))
            .map_err(|source| BusError::Spawn {
                name: "transport worker",
                source,
            })?;

        debug!(link = %name, "transport worker started");
        self.worker = Some(Worker { name, stop, handle });
        Ok(())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("link", &self.link_name())
            .field("config", &self.config)
            .finish()
    }
}

fn run(
    mut link: Box<dyn Link>,
    bus: &MessageBus,
    config: &WorkerConfig,
    stop: &Receiver<()>,
) -> Box<dyn Link> {
    let mut reader = FrameReader::with_config(config.frame.clone());

    loop {
        match stop.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        if pass(&mut *link, &mut reader, bus) {
            continue;
        }

        match stop.recv_timeout(config.poll_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(link = link.name(), "transport worker stopped");
    link
}

/// One receive + send pass. Returns whether either direction moved data.
///
/// Faults are logged and reported as "no progress" so the loop backs off
/// for one poll interval and retries.
fn pass(link: &mut dyn Link, reader: &mut FrameReader, bus: &MessageBus) -> bool {
    let received = match receive(link, reader, bus) {
        Ok(received) => received,
        Err(err) => {
            warn!(link = link.name(), error = %err, "read from link failed");
            false
        }
    };

    let sent = match send(link, bus) {
        Ok(sent) => sent,
        Err(err) => {
            warn!(link = link.name(), error = %err, "write to link failed");
            false
        }
    };

    received || sent
}

fn receive(
    link: &mut dyn Link,
    reader: &mut FrameReader,
    bus: &MessageBus,
) -> std::result::Result<bool, FrameError> {
    let Some(frames) = reader.poll(link)? else {
        return Ok(false);
    };

    for frame in frames {
        trace!(len = frame.len(), "received frame");
        bus.incoming().enqueue(frame);
    }
    Ok(true)
}

fn send(link: &mut dyn Link, bus: &MessageBus) -> std::result::Result<bool, FrameError> {
    let Some(frame) = bus.outgoing().try_dequeue() else {
        return Ok(false);
    };

    if let Err(err) = write_frame(link, &frame) {
        // Retry before anything newer, resuming after bytes already on the
        // wire so the device never sees a repeated prefix.
        match &err {
            FrameError::PartialWrite { written, total, .. } if written < total => {
                let rest = frame.into_bytes().slice(*written..);
                bus.outgoing().requeue_front(Frame::new(rest));
            }
            FrameError::PartialWrite { .. } => {}
            _ => bus.outgoing().requeue_front(frame),
        }
        return Err(err);
    }

    trace!(len = frame.len(), "sent frame");
    Ok(true)
}
