//! Delegation requests.

use rbsgen_ast::NamespacePath;
use rbsgen_types::TypeName;
use smol_str::SmolStr;

/// One forwarded method: inside `namespace`, calls to `method` go to
/// `to.method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delegate {
    pub namespace: NamespacePath,
    /// The delegation target, a method of the owning class
    pub to: SmolStr,
    /// The forwarded method, looked up on the target's types
    pub method: SmolStr,
}

impl Delegate {
    pub fn new(namespace: NamespacePath, to: impl Into<SmolStr>, method: impl Into<SmolStr>) -> Self {
        Self {
            namespace,
            to: to.into(),
            method: method.into(),
        }
    }

    /// The owning class as an absolute type name. Top-level delegates have
    /// no owner.
    pub fn owner(&self) -> Option<TypeName> {
        TypeName::from_segments(self.namespace.segments().iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner() {
        let delegate = Delegate::new(NamespacePath::new(["Foo", "Bar"]), "baz", "qux");
        assert_eq!(delegate.owner().map(|n| n.to_string()), Some("::Foo::Bar".into()));

        let top_level = Delegate::new(NamespacePath::root(), "baz", "qux");
        assert!(top_level.owner().is_none());
    }
}
