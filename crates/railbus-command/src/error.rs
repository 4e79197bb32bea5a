/// Errors reported by [`crate::parse_text`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The parser entered its error state on this character.
    #[error("syntax error at position {position}: unexpected {found:?}")]
    Syntax { position: usize, found: char },

    /// The text ended in the middle of a command.
    #[error("incomplete command (expected `b<block> s<speed>` followed by a newline)")]
    Incomplete,
}

pub type Result<T> = std::result::Result<T, ParseError>;
