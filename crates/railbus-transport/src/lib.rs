//! Byte-level links to the railway control hardware.
//!
//! Provides a unified interface over the connections a bridge can own:
//! - RS-232 class serial ports (via the `serialport` crate)
//! - In-memory link pairs (simulation and tests)
//!
//! This is the lowest layer of railbus. Everything else builds on top of
//! the [`Link`] trait provided here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryLink;
pub use serial::{Parity, SerialConfig, SerialLink, DEFAULT_BAUD_RATE};
pub use traits::Link;
