use thiserror::Error;

use crate::token::Span;

/// Syntax error naming every terminal that would have been acceptable at
/// the failure point. The terminal names come from the static table in
/// `token::terminal_name`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Expected {}, got {found}", one_of(.expected))]
pub struct SyntaxError {
    pub expected: Vec<&'static str>,
    pub found: String,
    pub span: Span,
}

impl SyntaxError {
    pub(crate) fn new(expected: Vec<&'static str>, found: String, span: Span) -> Self {
        Self {
            expected,
            found,
            span,
        }
    }
}

fn one_of(expected: &[&'static str]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [single] => (*single).to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}
