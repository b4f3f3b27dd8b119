//! # rbsgen Parser
//!
//! Parses Ruby source code into a syntax tree.
//!
//! Uses recursive descent with precedence climbing for binary operators.
//! Parsing never aborts: malformed statements are reported and skipped so
//! that declarations elsewhere in the file are still found.
//!
//! ## Example
//!
//! ```
//! use rbsgen_parser::parse;
//!
//! let source = r#"
//!     class User
//!       delegate :name, to: :profile
//!     end
//! "#;
//!
//! let result = parse(source);
//! assert!(result.errors.is_empty());
//! ```

mod error;
mod parser;

pub use error::ParseError;
pub use parser::Parser;

use rbsgen_ast::SourceFile;

/// Result of parsing.
pub struct ParseResult {
    /// The parsed tree (may be partial if errors occurred)
    pub ast: SourceFile,
    /// Any errors encountered during parsing
    pub errors: Vec<ParseError>,
}

/// Parse source code into a syntax tree.
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let ast = parser.parse_source_file();
    ParseResult {
        ast,
        errors: parser.into_errors(),
    }
}
