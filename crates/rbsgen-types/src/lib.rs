//! # rbsgen Types
//!
//! The RBS type algebra, a reader for `.rbs` signature files, and the
//! environment that turns loaded declarations into instance definitions.
//!
//! ## Example
//!
//! ```
//! use rbsgen_types::{Environment, TypeName, TypeRepository};
//!
//! let mut env = Environment::new();
//! env.load_str("class Counter def count: () -> Integer end").unwrap();
//!
//! let counter = TypeName::parse("Counter").unwrap();
//! let definition = env.instance_definition(&counter).unwrap();
//! let count = definition.method("count").unwrap();
//! assert_eq!(count.defs[0].to_string(), "() -> Integer");
//! ```

mod definition;
mod env;
mod name;
pub mod sig;
mod ty;

pub use definition::{InstanceDefinition, LookupError, MethodDefinition, TypeRepository};
pub use env::{Environment, LoadError, LoadReport, CORE_SIGNATURES};
pub use name::{TypeName, TypeNameKind};
pub use sig::SigParseError;
pub use ty::{BaseType, Block, LiteralType, MethodType, Param, Params, Substitution, Type};
