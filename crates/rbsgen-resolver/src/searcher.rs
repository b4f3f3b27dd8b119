//! Method type search for delegated methods.

use rbsgen_types::{MethodType, Type, TypeName, TypeRepository};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::delegate::Delegate;

/// The signature used whenever nothing better can be determined.
pub const UNTYPED_SIGNATURE: &str = "() -> untyped";

/// Looks up the signatures a delegated method forwards to.
///
/// Holds nothing but the repository, so one searcher can serve any number
/// of requests.
pub struct MethodSearcher<'a> {
    repository: &'a dyn TypeRepository,
}

impl<'a> MethodSearcher<'a> {
    pub fn new(repository: &'a dyn TypeRepository) -> Self {
        Self { repository }
    }

    /// Candidate signatures for `delegate`, in the order the target's
    /// return types and then the forwarded method's overloads are declared.
    pub fn method_types_for(&self, delegate: &Delegate) -> Vec<String> {
        let return_types = self.target_return_types(delegate);
        if return_types.iter().any(Type::is_any) {
            return vec![UNTYPED_SIGNATURE.to_string()];
        }

        let mut seen = FxHashSet::default();
        let mut signatures: Vec<String> = type_names(&return_types)
            .iter()
            .flat_map(|type_name| self.method_types(type_name, &delegate.method))
            .map(|method_type| method_type.to_string())
            .filter(|signature| seen.insert(signature.clone()))
            .collect();

        if signatures.is_empty() {
            signatures.push(UNTYPED_SIGNATURE.to_string());
        }
        signatures
    }

    /// Return types of every overload of the delegation target.
    fn target_return_types(&self, delegate: &Delegate) -> Vec<Type> {
        let Some(owner) = delegate.owner() else {
            debug!("Delegate to {} has no owning class", delegate.to);
            return Vec::new();
        };
        self.method_types(&owner, &delegate.to)
            .into_iter()
            .map(|method_type| method_type.return_type)
            .collect()
    }

    /// Overloads of `method` on instances of `type_name`. Failed lookups
    /// yield nothing.
    fn method_types(&self, type_name: &TypeName, method: &str) -> Vec<MethodType> {
        let definition = match self.repository.instance_definition(type_name) {
            Ok(definition) => definition,
            Err(err) => {
                debug!("Lookup of {} failed: {}", type_name, err);
                return Vec::new();
            }
        };
        match definition.method(method) {
            Some(found) => found.defs.clone(),
            None => {
                debug!("{} has no method {}", type_name, method);
                Vec::new()
            }
        }
    }
}

/// Names of the types a value of one of `types` may have. One level of
/// optional is unwrapped; shapes without a single name are dropped.
fn type_names(types: &[Type]) -> Vec<TypeName> {
    let mut names: Vec<TypeName> = Vec::new();
    for ty in types {
        let ty = match ty {
            Type::Optional(inner) => inner.as_ref(),
            other => other,
        };
        if let Some(name) = ty.type_name() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbsgen_types::BaseType;
    use smol_str::SmolStr;

    fn class(name: &str) -> Type {
        Type::class_instance(TypeName::parse(name).unwrap())
    }

    #[test]
    fn test_type_names_unwrap_one_optional() {
        let types = vec![
            Type::Optional(Box::new(class("Foo"))),
            class("Foo"),
            Type::ClassSingleton(TypeName::parse("Bar").unwrap()),
            Type::Optional(Box::new(Type::Optional(Box::new(class("Deep"))))),
            Type::Union(vec![class("A"), class("B")]),
            Type::Base(BaseType::Nil),
            Type::Variable(SmolStr::from("T")),
        ];
        let names: Vec<String> = type_names(&types).iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["Foo", "Bar"]);
    }
}
