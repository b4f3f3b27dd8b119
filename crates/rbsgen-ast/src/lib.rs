//! # rbsgen AST
//!
//! Syntax tree definitions for the subset of Ruby that rbsgen analyzes.
//!
//! The tree keeps source locations for diagnostics and is the input to the
//! declaration collector. Call arguments are stored exactly as written so
//! that later stages can evaluate them lazily.

mod ast;
mod namespace;
mod span;

pub use ast::*;
pub use namespace::NamespacePath;
pub use span::{Span, Spanned};
