//! Lexer for Pandaura Structured Text.
//!
//! Tokenizes ST source into a stream of tokens with byte ranges into the
//! source text. Time literals carry their millisecond value once decoded via
//! [`decode_time_literal`]; string literals are unescaped with
//! [`decode_string_literal`].

mod tokens;

pub use tokens::TokenKind;

use logos::Logos;
use text_size::{TextRange, TextSize};

use crate::error::LexError;

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The byte range of the token in the source text.
    pub range: TextRange,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, range: TextRange) -> Self {
        Self { kind, range }
    }

    /// The token's slice of the source.
    #[must_use]
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[usize::from(self.range.start())..usize::from(self.range.end())]
    }
}

/// Lex the entire source, skipping trivia, appending an EOF token.
///
/// The first unrecognised character aborts lexing with [`LexError`].
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = TokenKind::lexer(source);
    let mut out = Vec::new();
    while let Some(kind) = lexer.next() {
        let span = lexer.span();
        let kind = kind.unwrap_or(TokenKind::Error);
        if kind == TokenKind::Error {
            return Err(LexError {
                pos: span.start as u32,
                got: source[span.start..span.end].into(),
            });
        }
        if kind.is_trivia() {
            continue;
        }
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        out.push(Token::new(kind, range));
    }
    let end = TextSize::of(source);
    out.push(Token::new(TokenKind::Eof, TextRange::new(end, end)));
    Ok(out)
}

/// Decode a `T#…`/`TIME#…` literal into milliseconds.
///
/// The lexer guarantees the shape `prefix # digits [. digits] unit`, so this
/// only has to scale by the unit.
#[must_use]
pub fn decode_time_literal(text: &str) -> i64 {
    let body = match text.split_once('#') {
        Some((_, body)) => body,
        None => return 0,
    };
    let unit_start = body
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let (digits, unit) = body.split_at(unit_start);
    let magnitude: f64 = digits.parse().unwrap_or(0.0);
    let scale = match unit.to_ascii_lowercase().as_str() {
        "ms" => 1.0,
        "s" => 1_000.0,
        "m" => 60_000.0,
        "h" => 3_600_000.0,
        "d" => 86_400_000.0,
        _ => 1.0,
    };
    (magnitude * scale).round() as i64
}

/// Decode a quoted string literal, resolving `\` escapes.
#[must_use]
pub fn decode_string_literal(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Map a byte offset to a 1-based (line, column) pair.
#[must_use]
pub fn line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut col = 1u32;
    for c in source[..offset].chars() {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
