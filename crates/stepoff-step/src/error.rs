//! Error types for STEP reading.

use thiserror::Error;

/// Errors that can occur while reading a STEP exchange structure.
///
/// Only [`StepError::Io`] is fatal to a conversion. Everything else is
/// reported per record and absorbed by the caller.
#[derive(Error, Debug)]
pub enum StepError {
    /// I/O error reading the input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lexer error: unexpected character or malformed token.
    #[error("Lexer error at line {line}, column {col}: {message}")]
    Lexer {
        /// Line number (1-indexed).
        line: usize,
        /// Column number (1-indexed).
        col: usize,
        /// Error message.
        message: String,
    },

    /// A statement could not be tokenized or parsed into a record.
    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord {
        /// Line where the statement starts (1-indexed).
        line: usize,
        /// Error message.
        message: String,
    },

    /// A record parameter has the wrong shape (arity, kind of value).
    #[error("Bad argument{}: {message}", entity_id.map(|id| format!(" in entity #{}", id)).unwrap_or_default())]
    Argument {
        /// Entity ID where the error occurred, if known.
        entity_id: Option<u64>,
        /// Error message.
        message: String,
    },

    /// A reference points at an entity that does not exist.
    #[error("Unresolved reference: #{0}")]
    UnresolvedReference(u64),

    /// A reference points at an entity of the wrong kind.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected keyword.
        expected: String,
        /// Actual keyword.
        actual: String,
    },
}

impl StepError {
    /// Create a lexer error.
    pub fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    /// Create a malformed-record error.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }

    /// Create an argument error.
    pub fn argument(entity_id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Argument {
            entity_id,
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
