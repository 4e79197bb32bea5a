use std::io::ErrorKind;

use bytes::BytesMut;
use railbus_transport::Link;
use tracing::{trace, warn};

use crate::codec::{split_frames, Frame, FrameConfig, SENTINEL};
use crate::error::{FrameError, Result};

/// Incrementally splits inbound link bytes into frames.
///
/// Holds the partial tail between reads. A link has exactly one reader, so
/// there is at most one partial tail per link.
///
/// A tail that outgrows `max_pending` is dropped along with every byte up to
/// and including the next sentinel, so the remainder of an oversized message
/// never surfaces as a frame.
pub struct FrameReader {
    pending: BytesMut,
    chunk: Vec<u8>,
    config: FrameConfig,
    discarding: bool,
}

impl FrameReader {
    /// Create a new frame reader with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            pending: BytesMut::new(),
            chunk: vec![0u8; config.read_chunk.max(1)],
            config,
            discarding: false,
        }
    }

    /// Feed raw bytes and return every frame they complete.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        let mut data = data;
        if self.discarding {
            let Some(end) = data.iter().position(|&b| b == SENTINEL) else {
                trace!(discarded = data.len(), "skipping oversized message");
                return Vec::new();
            };
            trace!(discarded = end, "oversized message ended");
            data = &data[end + 1..];
            self.discarding = false;
        }

        let (frames, tail) = split_frames(&self.pending, data);
        self.pending = tail;

        if self.pending.len() > self.config.max_pending {
            warn!(
                discarded = self.pending.len(),
                max = self.config.max_pending,
                "no sentinel within pending limit; discarding until next sentinel"
            );
            self.pending.clear();
            self.discarding = true;
        }

        frames
    }

    /// Drain whatever the link has waiting, without blocking.
    ///
    /// Returns `Ok(None)` when no bytes were available. `Ok(Some(frames))`
    /// means bytes were consumed, even if they completed no frame.
    pub fn poll<L: Link + ?Sized>(&mut self, link: &mut L) -> Result<Option<Vec<Frame>>> {
        let available = link.bytes_to_read()?;
        if available == 0 {
            return Ok(None);
        }

        let want = available.min(self.chunk.len());
        let read = match link.read(&mut self.chunk[..want]) {
            Ok(n) => n,
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                return Ok(None)
            }
            Err(err) => return Err(FrameError::Io(err)),
        };

        if read == 0 {
            return Ok(None);
        }

        trace!(read, link = link.name(), "read bytes");
        let data = self.chunk[..read].to_vec();
        Ok(Some(self.feed(&data)))
    }

    /// Bytes received after the last sentinel.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use railbus_transport::memory;

    use super::*;

    #[test]
    fn feed_reassembles_across_calls() {
        let mut reader = FrameReader::new();
        assert!(reader.feed(&[1, 0, 0x42]).is_empty());
        assert_eq!(reader.pending(), &[1, 0, 0x42]);

        let frames = reader.feed(&[5, 1, 0xFF, 1, 0]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[1, 0, 0x42, 5, 1]);
        assert_eq!(reader.pending(), &[1, 0]);
    }

    #[test]
    fn feed_byte_by_byte() {
        let wire = [1, 0, 0x41, 3, 80, 0xFF, 1, 0, 0x41, 4, 90, 0xFF];
        let mut reader = FrameReader::new();
        let mut frames = Vec::new();
        for byte in wire {
            frames.extend(reader.feed(&[byte]));
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), &[1, 0, 0x41, 3, 80]);
        assert_eq!(frames[1].as_bytes(), &[1, 0, 0x41, 4, 90]);
        assert!(reader.pending().is_empty());
    }

    #[test]
    fn oversized_tail_is_discarded() {
        let cfg = FrameConfig {
            max_pending: 4,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(cfg);
        assert!(reader.feed(&[1, 2, 3, 4, 5]).is_empty());
        assert!(reader.pending().is_empty());

        assert!(reader.feed(&[6, 0xFF]).is_empty());
        assert!(reader.pending().is_empty());

        let frames = reader.feed(&[7, 0xFF]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[7]);
    }

    #[test]
    fn oversized_message_tail_never_becomes_a_frame() {
        let cfg = FrameConfig {
            max_pending: 4,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(cfg);

        let frames = reader.feed(&[1, 0, 0x41, 0xFF, 9, 9, 9, 9, 9]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[1, 0, 0x41]);

        assert!(reader.feed(&[9, 9]).is_empty());
        let frames = reader.feed(&[9, 0xFF, 2, 0, 0x42, 0xFF]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[2, 0, 0x42]);
    }

    #[test]
    fn poll_returns_none_when_idle() {
        let (mut host, _device) = memory::pair("idle");
        let mut reader = FrameReader::new();
        assert!(reader.poll(&mut host).unwrap().is_none());
    }

    #[test]
    fn poll_drains_link() {
        let (mut host, mut device) = memory::pair("poll");
        device.write_all(&[1, 0, 0x42, 2, 1, 0xFF, 1, 0]).unwrap();

        let mut reader = FrameReader::new();
        let frames = reader.poll(&mut host).unwrap().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[1, 0, 0x42, 2, 1]);
        assert_eq!(reader.pending(), &[1, 0]);

        let mut rest = [0u8; 1];
        assert!(host.read(&mut rest).is_err());
    }

    #[test]
    fn poll_respects_read_chunk() {
        let (mut host, mut device) = memory::pair("chunk");
        device.write_all(&[9, 9, 9, 0xFF]).unwrap();

        let cfg = FrameConfig {
            read_chunk: 2,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(cfg);
        assert!(reader.poll(&mut host).unwrap().unwrap().is_empty());
        let frames = reader.poll(&mut host).unwrap().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[9, 9, 9]);
    }

    #[test]
    fn reset_drops_partial() {
        let mut reader = FrameReader::new();
        reader.feed(&[1, 2]);
        reader.reset();
        assert!(reader.pending().is_empty());
    }

    #[test]
    fn reset_ends_discarding() {
        let cfg = FrameConfig {
            max_pending: 2,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(cfg);
        reader.feed(&[1, 2, 3]);
        reader.reset();

        let frames = reader.feed(&[4, 0xFF]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[4]);
    }
}
