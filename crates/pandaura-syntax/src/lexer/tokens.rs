//! Token definitions for Pandaura Structured Text.
//!
//! The token kinds are designed to work with the `logos` lexer generator.
//! Keywords are matched case-insensitively; identifiers keep their original
//! spelling and are re-read from the source slice by the parser.

use logos::Logos;

/// All token kinds recognised in ST source.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Default)]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    /// Whitespace (spaces, tabs, newlines)
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    /// Single-line comment: // ...
    #[regex(r"//[^\r\n]*")]
    LineComment,

    /// Block comment: (* ... *), no nesting.
    #[regex(r"\(\*[^*]*\*+([^)*][^*]*\*+)*\)")]
    BlockComment,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    /// `;`
    #[token(";")]
    Semicolon,

    /// `:`
    #[token(":")]
    Colon,

    /// `,`
    #[token(",")]
    Comma,

    /// `.`
    #[token(".")]
    Dot,

    /// `..`
    #[token("..")]
    DotDot,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    // =========================================================================
    // OPERATORS
    // =========================================================================
    /// `:=`
    #[token(":=")]
    Assign,

    /// `=`
    #[token("=")]
    Eq,

    /// `<>`
    #[token("<>")]
    Neq,

    /// `!=`
    #[token("!=")]
    BangEq,

    /// `<`
    #[token("<")]
    Lt,

    /// `<=`
    #[token("<=")]
    LtEq,

    /// `>`
    #[token(">")]
    Gt,

    /// `>=`
    #[token(">=")]
    GtEq,

    /// `+`
    #[token("+")]
    Plus,

    /// `-`
    #[token("-")]
    Minus,

    /// `*`
    #[token("*")]
    Star,

    /// `/`
    #[token("/")]
    Slash,

    /// `%`
    #[token("%")]
    Percent,

    // =========================================================================
    // KEYWORDS - Program structure
    // =========================================================================
    /// `PROGRAM`
    #[token("PROGRAM", ignore(ascii_case))]
    KwProgram,

    /// `END_PROGRAM`
    #[token("END_PROGRAM", ignore(ascii_case))]
    KwEndProgram,

    /// `VAR`
    #[token("VAR", ignore(ascii_case))]
    KwVar,

    /// `END_VAR`
    #[token("END_VAR", ignore(ascii_case))]
    KwEndVar,

    // =========================================================================
    // KEYWORDS - Statements
    // =========================================================================
    /// `IF`
    #[token("IF", ignore(ascii_case))]
    KwIf,

    /// `THEN`
    #[token("THEN", ignore(ascii_case))]
    KwThen,

    /// `ELSIF`
    #[token("ELSIF", ignore(ascii_case))]
    KwElsif,

    /// `ELSE`
    #[token("ELSE", ignore(ascii_case))]
    KwElse,

    /// `END_IF`
    #[token("END_IF", ignore(ascii_case))]
    KwEndIf,

    /// `WHILE`
    #[token("WHILE", ignore(ascii_case))]
    KwWhile,

    /// `DO`
    #[token("DO", ignore(ascii_case))]
    KwDo,

    /// `END_WHILE`
    #[token("END_WHILE", ignore(ascii_case))]
    KwEndWhile,

    /// `FOR`
    #[token("FOR", ignore(ascii_case))]
    KwFor,

    /// `TO`
    #[token("TO", ignore(ascii_case))]
    KwTo,

    /// `BY`
    #[token("BY", ignore(ascii_case))]
    KwBy,

    /// `END_FOR`
    #[token("END_FOR", ignore(ascii_case))]
    KwEndFor,

    // =========================================================================
    // KEYWORDS - Operators
    // =========================================================================
    /// `AND`
    #[token("AND", ignore(ascii_case))]
    KwAnd,

    /// `OR`
    #[token("OR", ignore(ascii_case))]
    KwOr,

    /// `NOT`
    #[token("NOT", ignore(ascii_case))]
    KwNot,

    /// `MOD`
    #[token("MOD", ignore(ascii_case))]
    KwMod,

    /// `DIV`
    #[token("DIV", ignore(ascii_case))]
    KwDiv,

    // =========================================================================
    // KEYWORDS - Types
    // =========================================================================
    /// `ARRAY`
    #[token("ARRAY", ignore(ascii_case))]
    KwArray,

    /// `OF`
    #[token("OF", ignore(ascii_case))]
    KwOf,

    /// `BOOL`
    #[token("BOOL", ignore(ascii_case))]
    KwBool,

    /// `INT`
    #[token("INT", ignore(ascii_case))]
    KwInt,

    /// `DINT`
    #[token("DINT", ignore(ascii_case))]
    KwDint,

    /// `REAL`
    #[token("REAL", ignore(ascii_case))]
    KwReal,

    /// `LREAL`
    #[token("LREAL", ignore(ascii_case))]
    KwLreal,

    /// `STRING`
    #[token("STRING", ignore(ascii_case))]
    KwString,

    /// `TIME`
    #[token("TIME", ignore(ascii_case))]
    KwTime,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// `TRUE`
    #[token("TRUE", ignore(ascii_case))]
    KwTrue,

    /// `FALSE`
    #[token("FALSE", ignore(ascii_case))]
    KwFalse,

    /// Numeric literal: `123` or `123.45`
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    /// Time literal: `T#100ms`, `TIME#1.5s`
    #[regex(r"(T|TIME)#[0-9]+(\.[0-9]+)?(ms|s|m|h|d)", ignore(ascii_case))]
    TimeLiteral,

    /// String literal, single or double quoted, `\` escapes.
    #[regex(r#"'([^'\\]|\\.)*'"#)]
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLiteral,

    /// Identifier: letter or underscore, then alphanumerics/underscores.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Unrecognised input.
    #[default]
    Error,

    /// End of input (appended by the lexer driver).
    Eof,
}

impl TokenKind {
    /// Trivia tokens are skipped by the parser.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Keywords that name an elementary type in declarations.
    #[must_use]
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwBool
                | TokenKind::KwInt
                | TokenKind::KwDint
                | TokenKind::KwReal
                | TokenKind::KwLreal
                | TokenKind::KwString
                | TokenKind::KwTime
        )
    }

    /// Human-readable description used in parse errors.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::LineComment | TokenKind::BlockComment => "comment",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Assign => "':='",
            TokenKind::Eq => "'='",
            TokenKind::Neq => "'<>'",
            TokenKind::BangEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::KwProgram => "PROGRAM",
            TokenKind::KwEndProgram => "END_PROGRAM",
            TokenKind::KwVar => "VAR",
            TokenKind::KwEndVar => "END_VAR",
            TokenKind::KwIf => "IF",
            TokenKind::KwThen => "THEN",
            TokenKind::KwElsif => "ELSIF",
            TokenKind::KwElse => "ELSE",
            TokenKind::KwEndIf => "END_IF",
            TokenKind::KwWhile => "WHILE",
            TokenKind::KwDo => "DO",
            TokenKind::KwEndWhile => "END_WHILE",
            TokenKind::KwFor => "FOR",
            TokenKind::KwTo => "TO",
            TokenKind::KwBy => "BY",
            TokenKind::KwEndFor => "END_FOR",
            TokenKind::KwAnd => "AND",
            TokenKind::KwOr => "OR",
            TokenKind::KwNot => "NOT",
            TokenKind::KwMod => "MOD",
            TokenKind::KwDiv => "DIV",
            TokenKind::KwArray => "ARRAY",
            TokenKind::KwOf => "OF",
            TokenKind::KwBool => "BOOL",
            TokenKind::KwInt => "INT",
            TokenKind::KwDint => "DINT",
            TokenKind::KwReal => "REAL",
            TokenKind::KwLreal => "LREAL",
            TokenKind::KwString => "STRING",
            TokenKind::KwTime => "TIME",
            TokenKind::KwTrue => "TRUE",
            TokenKind::KwFalse => "FALSE",
            TokenKind::Number => "number",
            TokenKind::TimeLiteral => "time literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::Error => "unrecognised input",
            TokenKind::Eof => "end of input",
        }
    }
}
