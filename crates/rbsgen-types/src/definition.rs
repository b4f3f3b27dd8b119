//! Instance definitions and the repository seam.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use thiserror::Error;

use crate::name::TypeName;
use crate::ty::MethodType;

/// A method visible on instances of a type, with every overload in order.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    pub name: SmolStr,
    pub defs: Vec<MethodType>,
    /// The class, module or interface the overloads were written in
    pub defined_in: TypeName,
}

impl MethodDefinition {
    pub fn method_types(&self) -> impl Iterator<Item = &MethodType> {
        self.defs.iter()
    }
}

/// The resolved instance side of a type: its own methods plus everything
/// inherited, included or generated.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDefinition {
    pub type_name: TypeName,
    pub type_params: Vec<SmolStr>,
    pub methods: IndexMap<SmolStr, MethodDefinition>,
}

impl InstanceDefinition {
    pub fn new(type_name: TypeName) -> Self {
        Self {
            type_name,
            type_params: Vec::new(),
            methods: IndexMap::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.get(name)
    }
}

/// Why an instance definition could not be built.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("unknown type: {0}")]
    UnknownType(TypeName),

    #[error("cyclic definition involving {0}")]
    Cyclic(TypeName),

    #[error("malformed definition of {name}: {reason}")]
    Malformed { name: TypeName, reason: String },
}

/// A read-only source of instance definitions.
pub trait TypeRepository: Send + Sync {
    fn instance_definition(&self, name: &TypeName) -> Result<Arc<InstanceDefinition>, LookupError>;
}

impl<R: TypeRepository + ?Sized> TypeRepository for Arc<R> {
    fn instance_definition(&self, name: &TypeName) -> Result<Arc<InstanceDefinition>, LookupError> {
        (**self).instance_definition(name)
    }
}
