use thiserror::Error;

/// Lexical errors. Each is reported to the diagnostics sink with its source
/// span, after which the scanner skips one character and resumes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated character literal")]
    UnterminatedChar,
    #[error("Character literal must contain exactly one character")]
    WideCharLiteral,
    #[error("Unterminated block comment")]
    UnterminatedComment,
    #[error("Invalid escape sequence '\\{escape}'")]
    InvalidEscape { escape: char },
    #[error("Malformed Unicode escape: expected {expected} hex digits")]
    MalformedUnicodeEscape { expected: usize },
    #[error("Invalid Unicode code point U+{value:08X}")]
    InvalidCodePoint { value: u32 },
    #[error("Unterminated entity escape")]
    UnterminatedEntity,
    #[error("Unknown entity '&{name};'")]
    UnknownEntity { name: String },
    #[error("Invalid numeric literal '{literal}'")]
    InvalidNumericLiteral { literal: String },
    #[error("Unknown character '{character}'")]
    UnknownCharacter { character: char },
}

pub type LexResult<T> = Result<T, LexError>;
