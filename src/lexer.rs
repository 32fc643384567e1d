use std::{iter::Peekable, str::CharIndices};

use num_bigint::{BigInt, BigUint};

use crate::diagnostics::Diagnostics;
use crate::token::{self, Span, Token, TokenKind};

pub mod error;

use error::{LexError, LexResult};

/// HTML-style entity escapes accepted inside string and character literals,
/// sorted for binary search.
static ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("apos", '\''),
    ("copy", '\u{A9}'),
    ("deg", '\u{B0}'),
    ("gt", '>'),
    ("lt", '<'),
    ("micro", '\u{B5}'),
    ("nbsp", '\u{A0}'),
    ("para", '\u{B6}'),
    ("quot", '"'),
    ("sect", '\u{A7}'),
];

fn lookup_entity(name: &str) -> Option<char> {
    ENTITIES
        .binary_search_by_key(&name, |(entity, _)| entity)
        .ok()
        .map(|index| ENTITIES[index].1)
}

/// Forward-only scanner over the source text. Lookahead is bounded and
/// explicit: two characters for numeric disambiguation, up to three for the
/// delimiter table. Lexical errors go to the diagnostics sink, after which
/// the scanner skips one character and resumes, so it always reaches `Eof`.
pub struct Scanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self, diags: &mut Diagnostics) -> Token<'a> {
        loop {
            self.skip_whitespace_and_comments(diags);

            let Some(&(start_idx, ch)) = self.chars.peek() else {
                return Token::new(
                    TokenKind::Eof,
                    Span {
                        start: self.input.len(),
                        end: self.input.len(),
                        line: self.line,
                        column: self.column,
                    },
                );
            };
            let start_line = self.line;
            let start_column = self.column;

            let result = self.read_token(start_idx, ch);
            let span = Span {
                start: start_idx,
                end: self.current_index(),
                line: start_line,
                column: start_column,
            };
            match result {
                Ok(kind) => return Token::new(kind, span),
                Err(error) => {
                    diags.error(error.to_string(), span);
                    // Skip the offending character and resume.
                    self.advance_char();
                }
            }
        }
    }

    fn read_token(&mut self, start_idx: usize, ch: char) -> LexResult<TokenKind<'a>> {
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_identifier(start_idx));
        }
        if ch.is_ascii_digit()
            || (ch == '-' && self.second_char().is_some_and(|c| c.is_ascii_digit()))
        {
            return self.read_number(start_idx);
        }
        if ch == '"' {
            return self.read_string();
        }
        if ch == '\'' {
            return self.read_char_literal();
        }
        if let Some((pattern, kind)) = token::match_delimiter(&self.input[start_idx..]) {
            for _ in 0..pattern.len() {
                self.advance_char();
            }
            return Ok(kind);
        }
        Err(LexError::UnknownCharacter { character: ch })
    }

    fn skip_whitespace_and_comments(&mut self, diags: &mut Diagnostics) {
        while let Some(&(idx, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance_char();
                }
                '/' if self.input[idx..].starts_with("//") => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.advance_char();
                    }
                }
                '/' if self.input[idx..].starts_with("/*") => {
                    let span = Span {
                        start: idx,
                        end: idx + 2,
                        line: self.line,
                        column: self.column,
                    };
                    self.advance_char();
                    self.advance_char();
                    // Block comments do not nest.
                    let mut closed = false;
                    while let Some(&(inner, c)) = self.chars.peek() {
                        if c == '*' && self.input[inner..].starts_with("*/") {
                            self.advance_char();
                            self.advance_char();
                            closed = true;
                            break;
                        }
                        self.advance_char();
                    }
                    if !closed {
                        diags.error(LexError::UnterminatedComment.to_string(), span);
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self, start: usize) -> TokenKind<'a> {
        self.advance_char();
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance_char();
        }
        let end = self.current_index();
        let text = &self.input[start..end];
        token::lookup_keyword(text).unwrap_or(TokenKind::Identifier(text))
    }

    /// Numeric literals. A leading `-` directly followed by a digit is part
    /// of the literal (the negative-literal-vs-unary-minus split is lexical).
    /// A digit run followed by `..` stays an integer so range syntax works;
    /// the fractional part is only consumed when `.` is followed by a digit.
    fn read_number(&mut self, start: usize) -> LexResult<TokenKind<'a>> {
        let negative = self.peek_char() == Some('-');
        if negative {
            self.advance_char();
        }

        let cursor = self.current_index();
        let hex_rest = &self.input[cursor..];
        if hex_rest.starts_with("0x") || hex_rest.starts_with("0X") {
            self.advance_char();
            self.advance_char();
            let mut digits = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance_char();
                } else if c == '_' {
                    self.advance_char();
                } else {
                    break;
                }
            }
            let end = self.current_index();
            let value = BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| {
                LexError::InvalidNumericLiteral {
                    literal: self.input[start..end].to_string(),
                }
            })?;
            if negative {
                return Ok(TokenKind::Int(-BigInt::from(value)));
            }
            return Ok(TokenKind::Uint(value));
        }

        let mut digits = String::new();
        if negative {
            digits.push('-');
        }
        self.read_digit_run(&mut digits);

        if self.peek_char() == Some('.') && self.second_char().is_some_and(|c| c.is_ascii_digit()) {
            digits.push('.');
            self.advance_char();
            self.read_digit_run(&mut digits);
            let end = self.current_index();
            let value: f64 = digits
                .parse()
                .map_err(|_| LexError::InvalidNumericLiteral {
                    literal: self.input[start..end].to_string(),
                })?;
            return Ok(TokenKind::Float(value));
        }

        let end = self.current_index();
        let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| {
            LexError::InvalidNumericLiteral {
                literal: self.input[start..end].to_string(),
            }
        })?;
        Ok(TokenKind::Int(value))
    }

    /// Consumes a run of decimal digits, dropping `_` separators.
    fn read_digit_run(&mut self, digits: &mut String) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance_char();
            } else if c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self) -> LexResult<TokenKind<'a>> {
        self.advance_char(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(LexError::UnterminatedString),
                Some('"') => {
                    self.advance_char();
                    return Ok(TokenKind::Str(value));
                }
                Some('\\') => {
                    self.advance_char();
                    value.push(self.read_escape()?);
                }
                Some('&') => {
                    self.advance_char();
                    value.push(self.read_entity()?);
                }
                Some(c) => {
                    self.advance_char();
                    value.push(c);
                }
            }
        }
    }

    fn read_char_literal(&mut self) -> LexResult<TokenKind<'a>> {
        self.advance_char(); // opening quote
        let scalar = match self.peek_char() {
            None | Some('\n') => return Err(LexError::UnterminatedChar),
            Some('\'') => return Err(LexError::WideCharLiteral),
            Some('\\') => {
                self.advance_char();
                self.read_escape()?
            }
            Some('&') => {
                self.advance_char();
                self.read_entity()?
            }
            Some(c) => {
                self.advance_char();
                c
            }
        };
        match self.peek_char() {
            Some('\'') => {
                self.advance_char();
                Ok(TokenKind::Char(scalar))
            }
            None | Some('\n') => Err(LexError::UnterminatedChar),
            Some(_) => Err(LexError::WideCharLiteral),
        }
    }

    /// Resolves the character after a consumed backslash. The offending
    /// character of an invalid escape is left unconsumed for recovery.
    fn read_escape(&mut self) -> LexResult<char> {
        let Some(c) = self.peek_char() else {
            return Err(LexError::UnterminatedString);
        };
        let resolved = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            'u' => {
                self.advance_char();
                return self.read_unicode_escape(4);
            }
            'U' => {
                self.advance_char();
                return self.read_unicode_escape(8);
            }
            other => return Err(LexError::InvalidEscape { escape: other }),
        };
        self.advance_char();
        Ok(resolved)
    }

    /// `\uXXXX` takes exactly 4 hex digits, `\UXXXXXXXX` exactly 8. The
    /// value must name an assigned scalar (surrogates and out-of-range
    /// values are rejected).
    fn read_unicode_escape(&mut self, expected: usize) -> LexResult<char> {
        let mut value: u32 = 0;
        for _ in 0..expected {
            let digit = self
                .peek_char()
                .and_then(|c| c.to_digit(16))
                .ok_or(LexError::MalformedUnicodeEscape { expected })?;
            self.advance_char();
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or(LexError::InvalidCodePoint { value })
    }

    /// `&name;` entity escape, `&` already consumed.
    fn read_entity(&mut self) -> LexResult<char> {
        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some(';') => {
                    self.advance_char();
                    break;
                }
                Some(c) if c.is_ascii_alphanumeric() => {
                    name.push(c);
                    self.advance_char();
                }
                _ => return Err(LexError::UnterminatedEntity),
            }
        }
        lookup_entity(&name).ok_or(LexError::UnknownEntity { name })
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn second_char(&self) -> Option<char> {
        self.chars.clone().nth(1).map(|(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(idx, _)| idx)
            .unwrap_or(self.input.len())
    }
}

/// Scans the whole input. Lexical errors land in the sink; the returned
/// stream always ends with `Eof`.
pub fn tokenize<'a>(input: &'a str, diags: &mut Diagnostics) -> Vec<Token<'a>> {
    let mut scanner = Scanner::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token(diags);
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}
