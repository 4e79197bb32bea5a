/// Errors that can occur on a hardware link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred while reading or writing the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial driver rejected a query or setting.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The other end of the link has gone away.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
