//! Lexical namespace paths (`Foo::Bar`).

use std::fmt;

use smol_str::SmolStr;

use crate::ConstPath;

/// The chain of `class`/`module` names enclosing a point in the source.
///
/// Paths are values: two paths are equal iff their segments are equal in
/// order. The empty path is the top level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespacePath {
    segments: Vec<SmolStr>,
}

impl NamespacePath {
    /// The top-level namespace.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[SmolStr] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The innermost segment, if any.
    pub fn last(&self) -> Option<&SmolStr> {
        self.segments.last()
    }

    /// The enclosing path (`Foo::Bar` -> `Foo`). The root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Resolve a `class`/`module` name written inside this namespace.
    ///
    /// `class A::B` nested in `Foo` opens `Foo::A::B`; `class ::A` always
    /// opens `A` no matter where it appears.
    pub fn nested(&self, name: &ConstPath) -> Self {
        let mut segments = if name.absolute {
            Vec::new()
        } else {
            self.segments.clone()
        };
        segments.extend(name.segments.iter().cloned());
        Self { segments }
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("::")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn const_path(absolute: bool, segments: &[&str]) -> ConstPath {
        ConstPath {
            absolute,
            segments: segments.iter().map(|s| SmolStr::from(*s)).collect(),
        }
    }

    #[test]
    fn test_nested_relative() {
        let outer = NamespacePath::new(["Foo"]);
        let inner = outer.nested(&const_path(false, &["Bar", "Baz"]));
        assert_eq!(inner, NamespacePath::new(["Foo", "Bar", "Baz"]));
        assert_eq!(inner.to_string(), "Foo::Bar::Baz");
    }

    #[test]
    fn test_nested_absolute_resets() {
        let outer = NamespacePath::new(["Foo"]);
        let inner = outer.nested(&const_path(true, &["Bar"]));
        assert_eq!(inner, NamespacePath::new(["Bar"]));
    }

    #[test]
    fn test_root() {
        assert!(NamespacePath::root().is_root());
        assert_eq!(NamespacePath::root().to_string(), "");
        assert_eq!(NamespacePath::new(["A", "B"]).parent(), NamespacePath::new(["A"]));
    }
}
