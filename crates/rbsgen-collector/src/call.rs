//! Recorded declaration calls.

use rbsgen_ast::{Arguments, Expr, Span};
use std::fmt;

/// The declarations rbsgen understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// `class_attribute :name, ...`
    ClassAttribute,
    /// `delegate :name, to: :target`
    Delegate,
}

impl DeclarationKind {
    /// Recognize a receiver-less call by name.
    pub fn from_method_name(name: &str) -> Option<Self> {
        match name {
            "class_attribute" => Some(DeclarationKind::ClassAttribute),
            "delegate" => Some(DeclarationKind::Delegate),
            _ => None,
        }
    }

    pub fn method_name(self) -> &'static str {
        match self {
            DeclarationKind::ClassAttribute => "class_attribute",
            DeclarationKind::Delegate => "delegate",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Method visibility inside a class body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Recognize a visibility keyword call (`private`, `public`, `protected`).
    pub fn from_method_name(name: &str) -> Option<Self> {
        match name {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Whether a namespace was opened with `class` or `module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    Class,
    Module,
}

impl NamespaceKind {
    pub fn keyword(self) -> &'static str {
        match self {
            NamespaceKind::Class => "class",
            NamespaceKind::Module => "module",
        }
    }
}

/// One `class_attribute` or `delegate` call found in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub kind: DeclarationKind,
    /// Arguments exactly as written
    pub args: Arguments,
    /// Whether the call appeared after a bare `private`
    pub private: bool,
    /// Span of the whole call
    pub span: Span,
}

impl MethodCall {
    pub fn name(&self) -> &'static str {
        self.kind.method_name()
    }

    /// Argument slots in order, ending with the block-argument slot.
    pub fn raw_args(&self) -> impl Iterator<Item = Option<&Expr>> + '_ {
        self.args.raw()
    }

    pub fn raw_len(&self) -> usize {
        self.args.raw_len()
    }
}
