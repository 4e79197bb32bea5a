use std::fmt::Write as _;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{trace, warn};

use crate::message::{Header, HEADER_SIZE};

/// End-of-message sentinel. Marks frame boundaries and never appears as data.
pub const SENTINEL: u8 = 0xFF;

/// Default cap on bytes held while waiting for a sentinel: 16 KiB.
pub const DEFAULT_MAX_PENDING: usize = 16 * 1024;

/// One logical message.
///
/// Frames produced by [`encode_frame`] are wire-ready and end with
/// [`SENTINEL`]. Frames produced by [`split_frames`] carry the bytes between
/// two sentinels and never contain it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wrap raw bytes as a frame.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the frame ends with the sentinel (outbound, wire-ready).
    pub fn is_terminated(&self) -> bool {
        self.bytes.last() == Some(&SENTINEL)
    }

    /// The 3-byte header, if the frame is long enough to carry one.
    pub fn header(&self) -> Option<Header> {
        Header::try_from(self.body()).ok()
    }

    /// Bytes after the header, excluding a trailing sentinel.
    pub fn payload(&self) -> &[u8] {
        let body = self.body();
        if body.len() <= HEADER_SIZE {
            return &[];
        }
        &body[HEADER_SIZE..]
    }

    /// Frame bytes rendered as space-separated upper-case hex pairs.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 3);
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{byte:02X}");
        }
        out
    }

    fn body(&self) -> &[u8] {
        match self.bytes.split_last() {
            Some((&SENTINEL, rest)) => rest,
            _ => &self.bytes,
        }
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&'static [u8]> for Frame {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encode a header and payload into a wire-ready frame.
///
/// Wire format:
/// ```text
/// ┌─────────┬───────────┬────────────┬─────────────────┬──────┐
/// │ NodeId  │ DeviceId  │ MessageId  │ Payload         │ 0xFF │
/// │ (1B)    │ (1B)      │ (1B)       │ (any length)    │      │
/// └─────────┴───────────┴────────────┴─────────────────┴──────┘
/// ```
///
/// No escaping is performed. A payload byte equal to [`SENTINEL`] is logged
/// and written as-is; the receiver will see the frame split at that byte.
pub fn encode_frame(header: impl Into<Header>, payload: &[u8]) -> Frame {
    let header = header.into();
    if payload.contains(&SENTINEL) {
        warn!(
            ?header,
            "payload contains the end-of-message sentinel; frame will be split on the wire"
        );
    }

    let mut dst = BytesMut::with_capacity(HEADER_SIZE + payload.len() + 1);
    dst.put_slice(&header.to_bytes());
    dst.put_slice(payload);
    dst.put_u8(SENTINEL);
    Frame::new(dst.freeze())
}

/// Split a byte stream on [`SENTINEL`].
///
/// `previous_tail` is prefixed to the first span only. Every span that ends
/// at a sentinel becomes a complete frame; the bytes after the last sentinel
/// are returned as the new tail. Empty spans (two consecutive sentinels, or a
/// sentinel with no tail pending) yield no frame.
pub fn split_frames(previous_tail: &[u8], new_bytes: &[u8]) -> (Vec<Frame>, BytesMut) {
    let mut frames = Vec::new();
    let mut pending = BytesMut::with_capacity(previous_tail.len() + new_bytes.len());
    pending.put_slice(previous_tail);

    let mut spans = new_bytes.split(|&b| b == SENTINEL).peekable();
    while let Some(span) = spans.next() {
        pending.put_slice(span);
        if spans.peek().is_none() {
            break;
        }

        let complete = pending.split().freeze();
        if complete.is_empty() {
            trace!("dropping empty span between sentinels");
            continue;
        }
        frames.push(Frame::new(complete));
    }

    (frames, pending)
}

/// Configuration for inbound framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum bytes held without seeing a sentinel. Default: 16 KiB.
    pub max_pending: usize,
    /// Maximum bytes read from the link per poll. Default: 1 KiB.
    pub read_chunk: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
            read_chunk: 1024,
        }
    }
}
