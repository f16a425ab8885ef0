//! Lexer and parser errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Failure to tokenize the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised character at offset {pos}: '{got}'")]
pub struct LexError {
    /// Byte offset of the offending character.
    pub pos: u32,
    /// The text that could not be tokenized.
    pub got: SmolStr,
}

/// Failure to parse a token stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {pos}: expected {expected}, got {got}")]
pub struct ParseError {
    /// Byte offset of the offending token.
    pub pos: u32,
    /// Description of the token found.
    pub got: SmolStr,
    /// Description of what the parser expected.
    pub expected: SmolStr,
}

/// Either compile-time failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// Tokenization failed.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// Parsing failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    /// Byte offset of the failure.
    #[must_use]
    pub fn pos(&self) -> u32 {
        match self {
            SyntaxError::Lex(err) => err.pos,
            SyntaxError::Parse(err) => err.pos,
        }
    }
}
