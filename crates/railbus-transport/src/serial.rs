use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Link;

/// Baud rate used by the block controllers on the layout.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Parity setting for a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Line settings for opening a serial port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 115200.
    pub baud_rate: u32,
    /// Data bits per character (5-8). Default: 8.
    pub data_bits: u8,
    /// Parity. Default: none.
    pub parity: Parity,
    /// Stop bits (1 or 2). Default: 1.
    pub stop_bits: u8,
    /// Upper bound the driver may block a single read or write.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            timeout: Duration::from_millis(500),
        }
    }
}

impl SerialConfig {
    /// Default line settings at the given baud rate.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

/// Serial port link.
///
/// Owns the driver handle; dropping the link closes the port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open `port` at `baud_rate` with 8-N-1 line settings.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(port, &SerialConfig::with_baud_rate(baud_rate))
    }

    /// Open `port` with explicit line settings.
    pub fn open_with_config(port: &str, config: &SerialConfig) -> Result<Self> {
        let handle = serialport::new(port, config.baud_rate)
            .data_bits(to_data_bits(config.data_bits))
            .parity(to_parity(config.parity))
            .stop_bits(to_stop_bits(config.stop_bits))
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud_rate = config.baud_rate, "opened serial port");

        let link = Self {
            port: handle,
            name: port.to_string(),
        };
        // Bytes buffered before the open belong to no frame we can trust.
        link.clear()?;
        Ok(link)
    }

    /// Discard anything buffered by the driver in both directions.
    pub fn clear(&self) -> Result<()> {
        debug!(port = %self.name, "clearing driver buffers");
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Link for SerialLink {
    fn bytes_to_read(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("name", &self.name)
            .finish()
    }
}

fn to_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn to_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

fn to_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}
