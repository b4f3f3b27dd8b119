//! RBS signature files: tokens, declarations and the parser.

mod decl;
mod error;
mod parser;
mod token;

pub use decl::*;
pub use error::SigParseError;
pub use parser::{parse_method_type, parse_signature, parse_type};
pub use token::SigToken;
