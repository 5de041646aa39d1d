use colored::Colorize;
use thiserror::Error;

use crate::form::Location;

//===----------------------------------------------------------------------===//
// Error
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{0}")]
    SyntaxError(#[from] SyntaxError),
    #[error("{0}")]
    AnalyzerError(#[from] AnalyzerError),
    #[error("IO error: {0}")]
    IoError(String),
}

//===----------------------------------------------------------------------===//
// SyntaxError
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("Unexpected EOF: {}", .expected.as_deref().unwrap_or("None"))]
    UnexpectedEOF { expected: Option<String> },
    #[error("Unexpected token: {found} (expected: {expected})")]
    UnexpectedToken { found: String, expected: String },
    #[error("Unbalanced delimiter: {delimiter}")]
    UnbalancedDelimiter { delimiter: char },
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Invalid number: {value}")]
    InvalidNumber { value: String },
    #[error("Invalid map: {reason}")]
    InvalidMap { reason: String },
}

//===----------------------------------------------------------------------===//
// AnalyzerError
//===----------------------------------------------------------------------===//

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzerError {
    /// Malformed special form shape.
    #[error("{reason}")]
    InvalidForm { reason: String },
    #[error("{error_str}")]
    WrongArgumentCount { error_str: String },
    #[error("{reason}")]
    InvalidSymbol { reason: String },
    #[error("Cannot resolve symbol '{name}'")]
    UnresolvedSymbol { name: String },
    #[error("'def inside of a 'def is forbidden")]
    NestedDef,
    #[error("{reason}")]
    InvalidRecur { reason: String },
    #[error("Error in expanding macro \"{name}\": {message}")]
    MacroExpansion { name: String, message: String },
}

//===----------------------------------------------------------------------===//
// Diagnostic
//===----------------------------------------------------------------------===//

/// An error with the source location it was raised at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct Diagnostic {
    pub error: Error,
    pub location: Option<Location>,
}

pub type SpannedResult<T> = Result<T, Diagnostic>;

pub fn error_at(location: Option<&Location>, error: impl Into<Error>) -> Diagnostic {
    Diagnostic { error: error.into(), location: location.cloned() }
}

impl Diagnostic {
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn is_macro_expansion(&self) -> bool {
        matches!(self.error, Error::AnalyzerError(AnalyzerError::MacroExpansion { .. }))
    }

    /// Renders the error with the offending source line underlined.
    /// `source` is the text the location refers to.
    pub fn format_error(&self, source: &str) -> String {
        let Some(loc) = &self.location else {
            return format!("{} {}", "error:".red().bold(), self.message());
        };

        let line_idx = loc.start.line.saturating_sub(1) as usize;
        let Some(line_content) = source.lines().nth(line_idx) else {
            return format!("{} {} at {}", "error:".red().bold(), self.message(), loc);
        };

        let column = loc.start.column as usize;
        let width = if loc.end.line == loc.start.line && loc.end.column > loc.start.column {
            (loc.end.column - loc.start.column) as usize
        } else {
            1
        };
        let gutter = format!("{}", loc.start.line);
        let pad = " ".repeat(gutter.len());

        format!(
            "{} {}\n{}{} {}\n{} {} {}\n{} {} {}{}",
            "error:".red().bold(),
            self.message().bold(),
            pad,
            "-->".blue(),
            loc,
            gutter.blue(),
            "|".blue(),
            line_content,
            pad,
            "|".blue(),
            " ".repeat(column),
            "^".repeat(width).red()
        )
    }
}
