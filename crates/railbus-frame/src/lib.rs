//! Sentinel-terminated message framing for railway control links.
//!
//! Every message on the wire is laid out as:
//! - A 3-byte header: node id, device id, message id
//! - A variable payload
//! - The end-of-message sentinel `0xFF`
//!
//! The sentinel is never escaped, so it must not appear inside a payload.
//! Inbound bytes are split on the sentinel with the partial tail of one read
//! carried into the next.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{encode_frame, split_frames, Frame, FrameConfig, DEFAULT_MAX_PENDING, SENTINEL};
pub use error::{FrameError, Result};
pub use message::{
    block_power, block_speed, global_reset, message_name, Header, BLOCK_OCCUPATION, BLOCK_POWER,
    BLOCK_SPEED, HEADER_SIZE, INVALID_ID, NONE_ID, RESET,
};
pub use reader::FrameReader;
pub use writer::write_frame;
