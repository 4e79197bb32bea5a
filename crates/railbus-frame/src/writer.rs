use std::io::{ErrorKind, Write};

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Write a complete frame and flush (blocking).
///
/// The frame is written as-is; outbound frames are expected to already carry
/// the trailing sentinel.
///
/// A failure before any byte was accepted is reported as `Io` or
/// `ConnectionClosed`. Once some bytes are on the wire, a failure is
/// reported as [`FrameError::PartialWrite`] so the caller can resume from
/// `written` instead of repeating the prefix.
pub fn write_frame<W: Write + ?Sized>(dst: &mut W, frame: &Frame) -> Result<()> {
    let bytes = frame.as_bytes();
    let total = bytes.len();
    let mut offset = 0usize;
    while offset < total {
        match dst.write(&bytes[offset..]) {
            Ok(0) if offset == 0 => return Err(FrameError::ConnectionClosed),
            Ok(0) => {
                return Err(partial(offset, total, ErrorKind::WriteZero.into()));
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if offset == 0 => return Err(FrameError::Io(err)),
            Err(err) => return Err(partial(offset, total, err)),
        }
    }

    loop {
        match dst.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if total == 0 => return Err(FrameError::Io(err)),
            Err(err) => return Err(partial(total, total, err)),
        }
    }
}

fn partial(written: usize, total: usize, source: std::io::Error) -> FrameError {
    FrameError::PartialWrite {
        written,
        total,
        source,
    }
}
