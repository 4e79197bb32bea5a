//! Character-driven state machine for the `b<block> s<speed>` grammar.
//!
//! ```text
//!          'b'              's' (block fits u8)     '\n' (speed fits u8)
//!   Idle ──────▶ ReadingTargetId ─────────▶ ReadingSpeedValue ─────────▶ Idle + complete
//!                     │ other                       │ other
//!                     ▼                             ▼
//!                   Error ◀─────────────────────────┘
//! ```
//!
//! Spaces and tabs are ignored everywhere, `\r` counts as `\n`, and `x`
//! aborts whatever was typed so far.

use railbus_frame::{block_speed, Frame};
use tracing::debug;

use crate::error::{ParseError, Result};

/// Block id that addresses every block.
pub const BROADCAST_BLOCK: u8 = 0;

/// Blocks a broadcast expands to.
pub const BROADCAST_BLOCKS: [u8; 4] = [1, 2, 3, 4];

const ABORT: char = 'x';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Idle,
    ReadingTargetId,
    ReadingSpeedValue,
    Error,
}

/// Incremental parser for operator commands.
///
/// Feed characters with [`CommandParser::parse`]. After a command completes
/// or the parser errors, the caller must [`CommandParser::clear`] it; the
/// parser does not reset itself except on the abort character.
#[derive(Debug, Default)]
pub struct CommandParser {
    state: ParserState,
    target_digits: String,
    speed_digits: String,
    target: u8,
    speed: u8,
    complete: bool,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine by one character.
    pub fn parse(&mut self, ch: char) {
        let ch = match ch {
            ' ' | '\t' => return,
            '\r' => '\n',
            ABORT => {
                self.clear();
                return;
            }
            other => other,
        };

        match self.state {
            ParserState::Idle => {
                if ch == 'b' {
                    self.state = ParserState::ReadingTargetId;
                }
            }
            ParserState::ReadingTargetId => {
                if ch.is_ascii_digit() {
                    self.target_digits.push(ch);
                } else if ch == 's' {
                    match self.target_digits.parse::<u8>() {
                        Ok(target) => {
                            self.target = target;
                            self.state = ParserState::ReadingSpeedValue;
                        }
                        Err(_) => self.fail(ch),
                    }
                } else {
                    self.fail(ch);
                }
            }
            ParserState::ReadingSpeedValue => {
                if ch.is_ascii_digit() {
                    self.speed_digits.push(ch);
                } else if ch == '\n' {
                    match self.speed_digits.parse::<u8>() {
                        Ok(speed) => {
                            self.speed = speed;
                            self.complete = true;
                            self.state = ParserState::Idle;
                        }
                        Err(_) => self.fail(ch),
                    }
                } else {
                    self.fail(ch);
                }
            }
            ParserState::Error => {}
        }
    }

    /// Feed every character of `text`.
    pub fn parse_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.parse(ch);
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// A full command has been read and not yet cleared.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_error(&self) -> bool {
        self.state == ParserState::Error
    }

    /// Frames for the completed command, or `None` if nothing is complete.
    ///
    /// Block [`BROADCAST_BLOCK`] expands to one frame per entry of
    /// [`BROADCAST_BLOCKS`], all with the same speed.
    pub fn command_data(&self) -> Option<Vec<Frame>> {
        if !self.complete {
            return None;
        }

        let frames = if self.target == BROADCAST_BLOCK {
            BROADCAST_BLOCKS
                .iter()
                .map(|&block| block_speed(block, self.speed))
                .collect()
        } else {
            vec![block_speed(self.target, self.speed)]
        };
        Some(frames)
    }

    /// Reset state, buffers and the completion flag.
    pub fn clear(&mut self) {
        self.state = ParserState::Idle;
        self.target_digits.clear();
        self.speed_digits.clear();
        self.target = 0;
        self.speed = 0;
        self.complete = false;
    }

    fn fail(&mut self, ch: char) {
        debug!(
            state = ?self.state,
            found = ?ch,
            "command parser entered error state"
        );
        self.state = ParserState::Error;
    }
}

/// Parse a block of operator text into frames.
///
/// Every completed command contributes its frames in order. The first
/// syntax error aborts with its character position; text that stops in the
/// middle of a command is [`ParseError::Incomplete`].
pub fn parse_text(text: &str) -> Result<Vec<Frame>> {
    let mut parser = CommandParser::new();
    let mut frames = Vec::new();

    for (position, ch) in text.chars().enumerate() {
        parser.parse(ch);
        if parser.is_error() {
            return Err(ParseError::Syntax { position, found: ch });
        }
        if let Some(command) = parser.command_data() {
            frames.extend(command);
            parser.clear();
        }
    }

    if parser.state() != ParserState::Idle {
        return Err(ParseError::Incomplete);
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(text: &str) -> CommandParser {
        let mut parser = CommandParser::new();
        parser.parse_str(text);
        parser
    }

    #[test]
    fn single_block_command() {
        let parser = feed("b3 s80\n");
        assert!(parser.is_complete());
        assert!(!parser.is_error());
        assert_eq!(parser.state(), ParserState::Idle);

        let frames = parser.command_data().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[1, 0, 0x41, 3, 80, 0xFF]);
    }

    #[test]
    fn broadcast_expands_to_four_blocks() {
        let frames = feed("b0 s40\n").command_data().unwrap();
        let targets: Vec<u8> = frames.iter().map(|f| f.payload()[0]).collect();
        assert_eq!(targets, vec![1, 2, 3, 4]);
        for (frame, id) in frames.iter().zip(1u8..) {
            assert_eq!(frame.as_bytes(), &[1, 0, 0x41, id, 40, 0xFF]);
        }
    }

    #[test]
    fn abort_discards_partial_input() {
        let mut parser = feed("b3x s80\n");
        assert!(!parser.is_complete());
        assert!(!parser.is_error());
        assert!(parser.command_data().is_none());

        parser.parse_str("b2 s15\n");
        assert!(parser.is_complete());
        let frames = parser.command_data().unwrap();
        assert_eq!(frames[0].payload(), &[2, 15]);
    }

    #[test]
    fn abort_recovers_from_error() {
        let mut parser = feed("bq");
        assert!(parser.is_error());
        parser.parse('x');
        assert_eq!(parser.state(), ParserState::Idle);
        assert!(!parser.is_error());
    }

    #[test]
    fn non_digit_speed_is_sticky_error() {
        let mut parser = feed("b3 sXY\n");
        assert!(parser.is_error());

        parser.parse_str("b1 s1\n");
        assert!(parser.is_error());
        assert!(!parser.is_complete());

        parser.clear();
        assert!(!parser.is_error());
        parser.parse_str("b1 s1\n");
        assert!(parser.is_complete());
    }

    #[test]
    fn idle_ignores_everything_but_b() {
        let parser = feed("hello 42 s\n");
        assert_eq!(parser.state(), ParserState::Idle);
        assert!(!parser.is_error());
    }

    #[test]
    fn whitespace_tabs_and_carriage_return() {
        let parser = feed("\tb 1 2\ts 9 9\r");
        assert!(parser.is_complete());
        assert_eq!(parser.command_data().unwrap()[0].payload(), &[12, 99]);
    }

    #[test]
    fn out_of_range_values_are_errors() {
        assert!(feed("b256 s1\n").is_error());
        assert!(feed("b1 s256\n").is_error());
        assert!(feed("b255 s255\n").is_complete());
    }

    #[test]
    fn missing_digits_are_errors() {
        assert!(feed("bs1\n").is_error());
        assert!(feed("b1 s\n").is_error());
    }

    #[test]
    fn newline_before_speed_is_error() {
        let parser = feed("b1\n");
        assert!(parser.is_error());
    }

    #[test]
    fn clear_resets_completion() {
        let mut parser = feed("b1 s1\n");
        parser.clear();
        assert!(!parser.is_complete());
        assert!(parser.command_data().is_none());
        assert_eq!(parser.state(), ParserState::Idle);
    }

    #[test]
    fn parse_text_collects_multiple_commands() {
        let frames = parse_text("b1 s10\nb0 s5\n").unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].payload(), &[1, 10]);
        assert_eq!(frames[4].payload(), &[4, 5]);
    }

    #[test]
    fn parse_text_reports_position() {
        let err = parse_text("b1 s1\nb2 sZ\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 10,
                found: 'Z'
            }
        );
    }

    #[test]
    fn parse_text_rejects_unfinished_command() {
        assert_eq!(parse_text("b3 s80").unwrap_err(), ParseError::Incomplete);
        assert_eq!(parse_text("").unwrap(), Vec::new());
    }
}
