//! Qualified type names.

use smol_str::SmolStr;
use std::fmt;

/// What a type name refers to, derived from its spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeNameKind {
    /// `Foo`: a class or module
    Class,
    /// `_Foo`: an interface
    Interface,
    /// `foo`: a type alias
    Alias,
}

/// A possibly namespaced type name such as `::Foo::Bar` or `_Each`.
///
/// Two names are equal when their namespace, name and absoluteness are
/// equal; `Foo` and `::Foo` are distinct until one is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    pub namespace: Vec<SmolStr>,
    pub name: SmolStr,
    pub absolute: bool,
}

impl TypeName {
    pub fn new(namespace: Vec<SmolStr>, name: impl Into<SmolStr>, absolute: bool) -> Self {
        Self {
            namespace,
            name: name.into(),
            absolute,
        }
    }

    /// An absolute name from its segments, outermost first. Returns `None`
    /// for an empty path.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        let mut namespace: Vec<SmolStr> = segments.into_iter().map(Into::into).collect();
        let name = namespace.pop()?;
        Some(Self::new(namespace, name, true))
    }

    /// Parse `Foo::Bar`, `::Foo` or `_Each`.
    pub fn parse(text: &str) -> Option<Self> {
        let (absolute, rest) = match text.strip_prefix("::") {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let mut segments: Vec<SmolStr> = Vec::new();
        for segment in rest.split("::") {
            if segment.is_empty() {
                return None;
            }
            segments.push(SmolStr::from(segment));
        }
        let name = segments.pop()?;
        Some(Self::new(segments, name, absolute))
    }

    pub fn kind(&self) -> TypeNameKind {
        if self.name.starts_with('_') {
            TypeNameKind::Interface
        } else if self.name.starts_with(|c: char| c.is_ascii_uppercase()) {
            TypeNameKind::Class
        } else {
            TypeNameKind::Alias
        }
    }

    pub fn is_class(&self) -> bool {
        self.kind() == TypeNameKind::Class
    }

    pub fn is_interface(&self) -> bool {
        self.kind() == TypeNameKind::Interface
    }

    pub fn is_alias(&self) -> bool {
        self.kind() == TypeNameKind::Alias
    }

    /// The same name anchored at the root.
    pub fn absolute(&self) -> Self {
        Self {
            absolute: true,
            ..self.clone()
        }
    }

    /// This name written inside `context` (outermost first), as an absolute
    /// name. Absolute names ignore the context.
    pub fn in_context(&self, context: &[SmolStr]) -> Self {
        if self.absolute {
            return self.clone();
        }
        let mut namespace = context.to_vec();
        namespace.extend(self.namespace.iter().cloned());
        Self::new(namespace, self.name.clone(), true)
    }

    /// Namespace plus name, outermost first.
    pub fn segments(&self) -> Vec<SmolStr> {
        let mut segments = self.namespace.clone();
        segments.push(self.name.clone());
        segments
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            f.write_str("::")?;
        }
        for segment in &self.namespace {
            write!(f, "{}::", segment)?;
        }
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_spelling() {
        assert_eq!(TypeName::parse("Foo").map(|n| n.kind()), Some(TypeNameKind::Class));
        assert_eq!(
            TypeName::parse("::Foo::_Each").map(|n| n.kind()),
            Some(TypeNameKind::Interface)
        );
        assert_eq!(TypeName::parse("Foo::bar").map(|n| n.kind()), Some(TypeNameKind::Alias));
    }

    #[test]
    fn test_parse_and_display() {
        let name = TypeName::parse("::Foo::Bar").unwrap();
        assert!(name.absolute);
        assert_eq!(name.namespace, vec![SmolStr::from("Foo")]);
        assert_eq!(name.to_string(), "::Foo::Bar");
        assert!(TypeName::parse("Foo::").is_none());
        assert!(TypeName::parse("").is_none());
    }

    #[test]
    fn test_from_segments() {
        let name = TypeName::from_segments(["Foo", "Bar"]).unwrap();
        assert_eq!(name.to_string(), "::Foo::Bar");
        assert!(TypeName::from_segments(Vec::<SmolStr>::new()).is_none());
    }

    #[test]
    fn test_in_context() {
        let name = TypeName::parse("Bar").unwrap();
        let context = [SmolStr::from("Foo")];
        assert_eq!(name.in_context(&context).to_string(), "::Foo::Bar");
        let rooted = TypeName::parse("::Bar").unwrap();
        assert_eq!(rooted.in_context(&context).to_string(), "::Bar");
    }
}
