use std::fmt;

use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single reported problem. Warnings may carry a fix-it replacement for
/// the offending source range.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub fixit: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.span.line, self.span.column, self.severity, self.message
        )?;
        if let Some(fixit) = &self.fixit {
            write!(f, " (replace with '{fixit}')")?;
        }
        Ok(())
    }
}

/// Sink for lexical errors and parser warnings. Scanning reports here and
/// keeps going; only syntax errors abort a parse, and those travel as
/// `Result` values instead.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            span,
            fixit: None,
        });
    }

    pub fn warning(&mut self, message: impl Into<String>, span: Span, fixit: Option<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            span,
            fixit,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}
