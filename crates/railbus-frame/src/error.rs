use railbus_transport::TransportError;

/// Errors that can occur while moving frames over a link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame is too short to carry a header.
    #[error("frame truncated ({len} bytes, header needs {min})")]
    Truncated { len: usize, min: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link rejected a query.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The link failed after accepting part of a frame. The first
    /// `written` of `total` bytes are already on the wire.
    #[error("write failed after {written} of {total} bytes: {source}")]
    PartialWrite {
        written: usize,
        total: usize,
        source: std::io::Error,
    },

    /// The link accepted zero bytes of a non-empty frame.
    #[error("link closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
