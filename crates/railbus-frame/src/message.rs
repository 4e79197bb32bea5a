//! Wire header and the message-id catalogue understood by the block
//! controllers.
//!
//! Addressing is by node and device id. Node and device `0x00` mean "none";
//! `0xFF` is never a valid id since it collides with the sentinel.

use crate::codec::{encode_frame, Frame};
use crate::error::FrameError;

/// Header size: node id (1) + device id (1) + message id (1).
pub const HEADER_SIZE: usize = 3;

/// "No node" / "no device" id.
pub const NONE_ID: u8 = 0x00;

/// Reserved id; equal to the end-of-message sentinel.
pub const INVALID_ID: u8 = 0xFF;

/// Reset. Global: every node on the network. Node: the node and its devices.
pub const RESET: u8 = 0x01;

/// Turn power on or off for one block. Payload: `[block, on]`.
pub const BLOCK_POWER: u8 = 0x40;

/// Set the speed of one block. Payload: `[block, speed]`.
pub const BLOCK_SPEED: u8 = 0x41;

/// Block occupation changed (device event).
pub const BLOCK_OCCUPATION: u8 = 0x42;

/// Node that drives the track blocks.
const BLOCK_NODE: u8 = 1;

/// The fixed 3-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub node_id: u8,
    pub device_id: u8,
    pub message_id: u8,
}

impl Header {
    pub const fn new(node_id: u8, device_id: u8, message_id: u8) -> Self {
        Self {
            node_id,
            device_id,
            message_id,
        }
    }

    pub const fn to_bytes(self) -> [u8; HEADER_SIZE] {
        [self.node_id, self.device_id, self.message_id]
    }

    /// Addressed to every node.
    pub fn is_global(&self) -> bool {
        self.node_id == NONE_ID && self.device_id == NONE_ID
    }

    /// Addressed to a single node.
    pub fn is_node(&self) -> bool {
        is_valid_id(self.node_id) && self.device_id == NONE_ID
    }

    /// Addressed to a device on a node.
    pub fn is_device(&self) -> bool {
        is_valid_id(self.node_id) && is_valid_id(self.device_id)
    }

    pub fn is_valid(&self) -> bool {
        self.is_global() || self.is_node() || self.is_device()
    }
}

impl From<[u8; HEADER_SIZE]> for Header {
    fn from(bytes: [u8; HEADER_SIZE]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

impl TryFrom<&[u8]> for Header {
    type Error = FrameError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes {
            [node_id, device_id, message_id, ..] => {
                Ok(Self::new(*node_id, *device_id, *message_id))
            }
            _ => Err(FrameError::Truncated {
                len: bytes.len(),
                min: HEADER_SIZE,
            }),
        }
    }
}

fn is_valid_id(id: u8) -> bool {
    id != NONE_ID && id != INVALID_ID
}

/// Returns a human-readable name for a header's message.
pub fn message_name(header: &Header) -> &'static str {
    match (header.is_global(), header.message_id) {
        (_, NONE_ID) => "NONE",
        (_, INVALID_ID) => "INVALID",
        (true, RESET) => "GLOBAL_RESET",
        (false, RESET) => "RESET",
        (false, BLOCK_POWER) if header.is_node() => "BLOCK_POWER",
        (false, BLOCK_SPEED) if header.is_node() => "BLOCK_SPEED",
        (false, BLOCK_OCCUPATION) => "BLOCK_OCCUPATION",
        _ => "UNKNOWN",
    }
}

/// Set the speed of `block` on the block node.
pub fn block_speed(block: u8, speed: u8) -> Frame {
    encode_frame(Header::new(BLOCK_NODE, NONE_ID, BLOCK_SPEED), &[block, speed])
}

/// Switch power for `block` on the block node.
pub fn block_power(block: u8, on: bool) -> Frame {
    encode_frame(
        Header::new(BLOCK_NODE, NONE_ID, BLOCK_POWER),
        &[block, u8::from(on)],
    )
}

/// Reset every node on the network.
pub fn global_reset() -> Frame {
    encode_frame(Header::new(NONE_ID, NONE_ID, RESET), &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_speed_layout() {
        let frame = block_speed(3, 80);
        assert_eq!(frame.as_bytes(), &[1, 0, 0x41, 3, 80, 0xFF]);
    }

    #[test]
    fn block_power_layout() {
        assert_eq!(block_power(2, true).as_bytes(), &[1, 0, 0x40, 2, 1, 0xFF]);
        assert_eq!(block_power(2, false).as_bytes(), &[1, 0, 0x40, 2, 0, 0xFF]);
    }

    #[test]
    fn global_reset_layout() {
        let frame = global_reset();
        assert_eq!(frame.as_bytes(), &[0, 0, 0x01, 0xFF]);
        assert!(frame.header().unwrap().is_global());
    }

    #[test]
    fn header_classification() {
        assert!(Header::new(0, 0, RESET).is_global());
        assert!(Header::new(1, 0, BLOCK_SPEED).is_node());
        assert!(Header::new(1, 2, RESET).is_device());
        assert!(!Header::new(0xFF, 0, BLOCK_SPEED).is_valid());
        assert!(!Header::new(0, 3, RESET).is_valid());
        assert!(!Header::new(1, 0xFF, RESET).is_device());
    }

    #[test]
    fn header_from_short_slice_is_truncated() {
        let err = Header::try_from(&[1u8, 0][..]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { len: 2, min: 3 }));
    }

    #[test]
    fn names() {
        assert_eq!(message_name(&Header::new(0, 0, RESET)), "GLOBAL_RESET");
        assert_eq!(message_name(&Header::new(1, 0, RESET)), "RESET");
        assert_eq!(message_name(&Header::new(1, 0, BLOCK_SPEED)), "BLOCK_SPEED");
        assert_eq!(message_name(&Header::new(1, 0, BLOCK_POWER)), "BLOCK_POWER");
        assert_eq!(
            message_name(&Header::new(1, 0, BLOCK_OCCUPATION)),
            "BLOCK_OCCUPATION"
        );
        assert_eq!(message_name(&Header::new(1, 0, 0x7E)), "UNKNOWN");
    }
}
