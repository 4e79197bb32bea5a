//! Operator text command parser.
//!
//! Turns free-form text such as `b3 s80` ("block 3, speed 80") into
//! block-speed frames, one character at a time.

pub mod error;
pub mod parser;

pub use error::{ParseError, Result};
pub use parser::{parse_text, CommandParser, ParserState, BROADCAST_BLOCK, BROADCAST_BLOCKS};
