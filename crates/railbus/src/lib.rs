//! Serial bridge to model-railway block controllers.
//!
//! railbus moves sentinel-terminated command frames between a host and a
//! block controller over a serial line, and turns operator text such as
//! `b2 s120` into those frames.
//!
//! # Crate Structure
//!
//! - [`transport`]: the `Link` abstraction, serial ports and in-memory links
//! - [`frame`]: `0xFF`-terminated framing, headers and message constructors
//! - [`command`]: the operator command parser
//! - [`bus`]: transport worker, message queues, subscriber fan-out and the
//!   `Bridge` entry point

/// Re-export transport types.
pub mod transport {
    pub use railbus_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use railbus_frame::*;
}

/// Re-export command parser types.
pub mod command {
    pub use railbus_command::*;
}

/// Re-export bridge types.
pub mod bus {
    pub use railbus_bus::*;
}
