//! Parser error definitions.

use rbsgen_lexer::{LexError, TokenKind};
use thiserror::Error;

/// A parser error.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("unexpected token: expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        span: std::ops::Range<usize>,
    },

    #[error("unexpected end of file: expected {expected}")]
    UnexpectedEof {
        expected: String,
        span: std::ops::Range<usize>,
    },

    #[error("expected expression")]
    ExpectedExpr { span: std::ops::Range<usize> },

    #[error("expected name")]
    ExpectedName { span: std::ops::Range<usize> },

    #[error("unsupported syntax: {construct}")]
    Unsupported {
        construct: &'static str,
        span: std::ops::Range<usize>,
    },

    #[error("expression nested too deeply")]
    TooDeep { span: std::ops::Range<usize> },

    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    /// Get the span of this error.
    pub fn span(&self) -> std::ops::Range<usize> {
        match self {
            ParseError::UnexpectedToken { span, .. } => span.clone(),
            ParseError::UnexpectedEof { span, .. } => span.clone(),
            ParseError::ExpectedExpr { span } => span.clone(),
            ParseError::ExpectedName { span } => span.clone(),
            ParseError::Unsupported { span, .. } => span.clone(),
            ParseError::TooDeep { span } => span.clone(),
            ParseError::Lex(err) => err.span(),
        }
    }
}
