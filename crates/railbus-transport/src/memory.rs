//! In-memory links.
//!
//! [`pair`] returns two connected ends; bytes written to one become readable
//! on the other. Reads never block: an empty link reports `WouldBlock`.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};
use crate::traits::Link;

#[derive(Default)]
struct Pipe {
    bytes: Mutex<VecDeque<u8>>,
}

impl Pipe {
    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One end of an in-memory link.
pub struct MemoryLink {
    name: String,
    inbound: Arc<Pipe>,
    outbound: Arc<Pipe>,
}

/// Create two connected in-memory links.
pub fn pair(name: &str) -> (MemoryLink, MemoryLink) {
    let a_to_b = Arc::new(Pipe::default());
    let b_to_a = Arc::new(Pipe::default());

    let host = MemoryLink {
        name: format!("{name}:host"),
        inbound: Arc::clone(&b_to_a),
        outbound: Arc::clone(&a_to_b),
    };
    let device = MemoryLink {
        name: format!("{name}:device"),
        inbound: a_to_b,
        outbound: b_to_a,
    };
    (host, device)
}

impl MemoryLink {
    /// Whether the other end still exists.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.outbound) > 1
    }
}

impl Read for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inbound = self.inbound.lock();
        if inbound.is_empty() {
            if buf.is_empty() || !self.is_connected() {
                return Ok(0);
            }
            return Err(std::io::Error::from(ErrorKind::WouldBlock));
        }

        let n = inbound.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.is_connected() {
            return Err(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "memory link peer dropped",
            ));
        }
        self.outbound.lock().extend(buf.iter().copied());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Link for MemoryLink {
    /// Fails with [`TransportError::Closed`] once the peer is gone and
    /// everything it sent has been read.
    fn bytes_to_read(&mut self) -> Result<usize> {
        let available = self.inbound.lock().len();
        if available == 0 && !self.is_connected() {
            return Err(TransportError::Closed);
        }
        Ok(available)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MemoryLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLink")
            .field("name", &self.name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
