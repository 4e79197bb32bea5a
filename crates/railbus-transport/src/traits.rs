use std::io::{Read, Write};

use crate::error::Result;

/// A connected byte link: implements Read + Write and can report how many
/// bytes are waiting without blocking.
///
/// The bridge worker polls [`Link::bytes_to_read`] instead of relying on
/// driver change notifications, then reads at most that many bytes.
pub trait Link: Read + Write + Send {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_to_read(&mut self) -> Result<usize>;

    /// Human-readable identifier for diagnostics.
    fn name(&self) -> &str;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn bytes_to_read(&mut self) -> Result<usize> {
        (**self).bytes_to_read()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
