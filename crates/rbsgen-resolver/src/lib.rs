//! Signature resolution for methods generated by `delegate`.
//!
//! `delegate :name, to: :target` defines a method that forwards to
//! `target.name`. This crate finds what `target` returns in the owning
//! class, then looks `name` up on each of those types:
//! - Lookups that fail contribute nothing
//! - An `untyped` target makes the whole result `() -> untyped`
//! - An empty result falls back to `() -> untyped`
//!
//! ## Example
//!
//! ```
//! use rbsgen_ast::NamespacePath;
//! use rbsgen_resolver::{resolve_delegate_signatures, Delegate};
//! use rbsgen_types::Environment;
//!
//! let mut env = Environment::new();
//! env.load_str(r#"
//!     class Integer end
//!     class Counter def value: () -> Integer end
//!     class Integer def succ: () -> Integer end
//! "#).unwrap();
//!
//! let delegate = Delegate::new(NamespacePath::new(["Counter"]), "value", "succ");
//! assert_eq!(resolve_delegate_signatures(&delegate, &env), vec!["() -> Integer"]);
//! ```

mod delegate;
mod searcher;

pub use delegate::Delegate;
pub use searcher::{MethodSearcher, UNTYPED_SIGNATURE};

use rbsgen_types::TypeRepository;

/// Candidate signatures for the method generated by `delegate`. Never
/// empty, never duplicated.
pub fn resolve_delegate_signatures(
    delegate: &Delegate,
    repository: &dyn TypeRepository,
) -> Vec<String> {
    MethodSearcher::new(repository).method_types_for(delegate)
}
