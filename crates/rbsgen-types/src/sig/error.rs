//! Signature parse errors.

use thiserror::Error;

/// An error while reading a signature file.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SigParseError {
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: std::ops::Range<usize>,
    },

    #[error("unexpected end of signature: expected {expected}")]
    UnexpectedEof {
        expected: String,
        span: std::ops::Range<usize>,
    },

    #[error("invalid token")]
    InvalidToken { span: std::ops::Range<usize> },
}

impl SigParseError {
    pub fn span(&self) -> std::ops::Range<usize> {
        match self {
            SigParseError::UnexpectedToken { span, .. } => span.clone(),
            SigParseError::UnexpectedEof { span, .. } => span.clone(),
            SigParseError::InvalidToken { span } => span.clone(),
        }
    }
}
