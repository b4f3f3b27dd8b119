//! Declarations read from signature files.

use smol_str::SmolStr;

use crate::name::TypeName;
use crate::ty::{MethodType, Type};

/// A top-level or nested declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Class(ClassDecl),
    Module(ModuleDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    /// `class Foo = Bar`, `module Foo = Bar`
    ClassAlias(ClassAliasDecl),
}

/// A generic parameter of a class, module, interface or alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: SmolStr,
    /// `< Bound`
    pub upper_bound: Option<Type>,
}

/// A reference to a parent: superclass, included module, self type.
#[derive(Debug, Clone, PartialEq)]
pub struct Parent {
    pub name: TypeName,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub super_class: Option<Parent>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    /// `module Foo : _Bar`
    pub self_types: Vec<Parent>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassAliasDecl {
    pub new_name: TypeName,
    pub old_name: TypeName,
    pub is_module: bool,
}

/// Whether a member applies to instances, the singleton, or both
/// (`def self?.foo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    Instance,
    Singleton,
    Both,
}

impl MemberScope {
    pub fn includes_instance(self) -> bool {
        matches!(self, MemberScope::Instance | MemberScope::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Reader,
    Writer,
    Accessor,
}

/// A member of a class, module or interface body.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// `def name: sig | sig`
    Method {
        name: SmolStr,
        scope: MemberScope,
        overloads: Vec<MethodType>,
        /// Ends in `| ...`: adds to the inherited overloads
        overloading: bool,
    },
    /// `attr_reader name: Type`
    Attribute {
        kind: AttributeKind,
        name: SmolStr,
        ty: Type,
        scope: MemberScope,
    },
    /// `alias new_name old_name`
    Alias {
        new_name: SmolStr,
        old_name: SmolStr,
        scope: MemberScope,
    },
    Include(Parent),
    Prepend(Parent),
    Extend(Parent),
    /// Nested class, module, interface or alias
    Declaration(Declaration),
}
