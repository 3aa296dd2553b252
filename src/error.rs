//! Errors raised while reading a netrc document.

use thiserror::Error;

use crate::ast::TokenKind;
use crate::parser::Rule;

pub type Result<T> = std::result::Result<T, Error>;

/// A netrc parse or I/O failure.
///
/// Parse errors carry the 1-based line they were detected on.
#[derive(Debug, Error)]
pub enum Error {
    /// A word that is not one of the netrc keywords
    #[error("line {line}: keyword expected; got {word}")]
    Syntax { line: usize, word: String },

    /// A second `default` record
    #[error("line {line}: multiple default token")]
    DuplicateDefault { line: usize },

    /// A `machine` record after the `default` record
    #[error("line {line}: default token must appear after all machine tokens")]
    DefaultOrder { line: usize },

    /// A field keyword outside a record, or repeated within one
    #[error("line {line}: unexpected token {keyword}")]
    UnexpectedField { line: usize, keyword: TokenKind },

    /// A keyword that needs a value at the end of the input
    #[error("line {line}: missing value after {keyword}")]
    MissingValue { line: usize, keyword: TokenKind },

    #[error("line {line}: input is not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("tokenizer failure: {0}")]
    Grammar(#[from] Box<pest::error::Error<Rule>>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Line number of a parse error, `None` for I/O and grammar failures.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Syntax { line, .. }
            | Error::DuplicateDefault { line }
            | Error::DefaultOrder { line }
            | Error::UnexpectedField { line, .. }
            | Error::MissingValue { line, .. }
            | Error::InvalidUtf8 { line } => Some(*line),
            Error::Grammar(_) | Error::Io(_) => None,
        }
    }

    /// True when a `machine` record was found after the `default` record.
    pub fn is_bad_default_order(&self) -> bool {
        matches!(self, Error::DefaultOrder { .. })
    }
}
