//! # rbsgen Collector
//!
//! Finds the metaprogramming declarations rbsgen generates signatures for
//! (`class_attribute` and `delegate`) together with their lexical context.
//!
//! The collector walks a parsed [`SourceFile`] once. It tracks the enclosing
//! `class`/`module` path and the current visibility, and records every
//! receiver-less declaration call with its arguments kept verbatim.
//!
//! ## Example
//!
//! ```
//! use rbsgen_ast::NamespacePath;
//! use rbsgen_collector::extract_declarations;
//!
//! let result = rbsgen_parser::parse("class User\n  delegate :name, to: :profile\nend\n");
//! let declarations = extract_declarations(&result.ast);
//!
//! let calls = &declarations[&NamespacePath::new(["User"])];
//! assert_eq!(calls.len(), 1);
//! assert!(!calls[0].private);
//! ```

mod call;
mod collector;

pub use call::{DeclarationKind, MethodCall, NamespaceKind, Visibility};
pub use collector::{Collector, Declarations};

use indexmap::IndexMap;
use rbsgen_ast::{NamespacePath, SourceFile};

/// Declaration calls grouped by the namespace they appear in.
///
/// Namespaces are ordered by first declaration; calls keep source order.
pub type DeclarationMap = IndexMap<NamespacePath, Vec<MethodCall>>;

/// Extract every declaration call from a source file.
pub fn extract_declarations(file: &SourceFile) -> DeclarationMap {
    collect(file).method_calls
}

/// Extract declaration calls together with the kind of every namespace seen.
pub fn collect(file: &SourceFile) -> Declarations {
    let mut collector = Collector::new();
    collector.visit_file(file);
    collector.finish()
}
