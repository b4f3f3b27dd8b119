//! # rbsgen Lexer
//!
//! Tokenizes Ruby source code into a stream of tokens.
//!
//! Only the subset of Ruby that shows up in class and module bodies is
//! covered: definitions, command calls, literals, blocks and the usual
//! operators. Heredocs and `%`-literals other than `%i[]`/`%w[]` are not
//! recognized and surface as [`LexError`]s.
//!
//! ## Example
//!
//! ```
//! use rbsgen_lexer::{Lexer, TokenKind};
//!
//! let source = "delegate :name, to: :user";
//! let lexer = Lexer::new(source);
//!
//! for token in lexer {
//!     println!("{:?}", token);
//! }
//! ```

mod error;
mod lexer;
mod token;

pub use error::LexError;
pub use lexer::Lexer;
pub use token::{StrLit, Token, TokenKind};

/// Tokenize source code into a vector of tokens.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for result in lexer {
        match result {
            Ok(token) => tokens.push(token),
            Err(err) => errors.push(err),
        }
    }

    (tokens, errors)
}
