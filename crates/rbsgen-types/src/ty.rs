//! The RBS type algebra.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::fmt;

use crate::name::TypeName;

/// Built-in base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Bool,
    Void,
    Nil,
    Top,
    Bottom,
    SelfType,
    Instance,
    Class,
    Boolish,
}

impl BaseType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        let base = match word {
            "bool" => BaseType::Bool,
            "void" => BaseType::Void,
            "nil" => BaseType::Nil,
            "top" => BaseType::Top,
            "bot" => BaseType::Bottom,
            "self" => BaseType::SelfType,
            "instance" => BaseType::Instance,
            "class" => BaseType::Class,
            "boolish" => BaseType::Boolish,
            _ => return None,
        };
        Some(base)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Void => "void",
            BaseType::Nil => "nil",
            BaseType::Top => "top",
            BaseType::Bottom => "bot",
            BaseType::SelfType => "self",
            BaseType::Instance => "instance",
            BaseType::Class => "class",
            BaseType::Boolish => "boolish",
        }
    }
}

/// A literal type: `1`, `"str"`, `:sym`, `true`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralType {
    Int(i64),
    Str(SmolStr),
    Symbol(SmolStr),
    Bool(bool),
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::Int(n) => write!(f, "{}", n),
            LiteralType::Str(s) => write!(f, "{:?}", s.as_str()),
            LiteralType::Symbol(s) => write!(f, ":{}", s),
            LiteralType::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// An RBS type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// `untyped`
    Any,
    /// `bool`, `void`, `nil`, `self`, ...
    Base(BaseType),
    /// `Integer`, `Array[String]`
    ClassInstance { name: TypeName, args: Vec<Type> },
    /// `singleton(Foo)`
    ClassSingleton(TypeName),
    /// `_Each[Integer]`
    Interface { name: TypeName, args: Vec<Type> },
    /// `json`, `Foo::config[T]`
    Alias { name: TypeName, args: Vec<Type> },
    /// `T?`
    Optional(Box<Type>),
    /// `A | B`
    Union(Vec<Type>),
    /// `A & B`
    Intersection(Vec<Type>),
    /// `[A, B]`
    Tuple(Vec<Type>),
    /// `{ id: Integer, name: String }`
    Record(Vec<(SmolStr, Type)>),
    /// `1`, `"str"`, `:sym`
    Literal(LiteralType),
    /// A type parameter in scope: `T`, `Elem`
    Variable(SmolStr),
    /// `^(Integer) -> String`
    Proc(Box<MethodType>),
}

impl Type {
    pub fn class_instance(name: TypeName) -> Self {
        Type::ClassInstance {
            name,
            args: Vec::new(),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// The referenced name of a class instance, class singleton, interface or
    /// alias type. Other shapes have no single name.
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Type::ClassInstance { name, .. }
            | Type::ClassSingleton(name)
            | Type::Interface { name, .. }
            | Type::Alias { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Rebuild the type bottom-up, applying `f` to every node after its
    /// children have been rebuilt.
    pub fn map(&self, f: &dyn Fn(Type) -> Type) -> Type {
        let list = |types: &[Type]| -> Vec<Type> { types.iter().map(|t| t.map(f)).collect() };
        let rebuilt = match self {
            Type::ClassInstance { name, args } => Type::ClassInstance {
                name: name.clone(),
                args: list(args),
            },
            Type::Interface { name, args } => Type::Interface {
                name: name.clone(),
                args: list(args),
            },
            Type::Alias { name, args } => Type::Alias {
                name: name.clone(),
                args: list(args),
            },
            Type::Optional(inner) => Type::Optional(Box::new(inner.map(f))),
            Type::Union(types) => Type::Union(list(types)),
            Type::Intersection(types) => Type::Intersection(list(types)),
            Type::Tuple(types) => Type::Tuple(list(types)),
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(key, ty)| (key.clone(), ty.map(f)))
                    .collect(),
            ),
            Type::Proc(method_type) => Type::Proc(Box::new(method_type.map(f))),
            Type::Any
            | Type::Base(_)
            | Type::ClassSingleton(_)
            | Type::Literal(_)
            | Type::Variable(_) => self.clone(),
        };
        f(rebuilt)
    }

    /// Replace type variables.
    pub fn substitute(&self, subst: &Substitution) -> Type {
        if subst.is_empty() {
            return self.clone();
        }
        self.map(&|ty| substitute_variable(ty, subst))
    }

    /// Rewrite every referenced type name.
    pub fn map_names(&self, rename: &dyn Fn(&TypeName) -> TypeName) -> Type {
        self.map(&|ty| rename_type(ty, rename))
    }

    /// Whether this type needs parentheses before a `?` suffix or inside a
    /// union/intersection member position.
    fn is_compound(&self) -> bool {
        matches!(self, Type::Union(_) | Type::Intersection(_) | Type::Proc(_))
    }
}

/// Type variable bindings used when inheriting from a generic parent.
pub type Substitution = FxHashMap<SmolStr, Type>;

fn substitute_variable(ty: Type, subst: &Substitution) -> Type {
    match ty {
        Type::Variable(name) => match subst.get(&name) {
            Some(bound) => bound.clone(),
            None => Type::Variable(name),
        },
        other => other,
    }
}

fn rename_type(ty: Type, rename: &dyn Fn(&TypeName) -> TypeName) -> Type {
    match ty {
        Type::ClassInstance { name, args } => Type::ClassInstance {
            name: rename(&name),
            args,
        },
        Type::ClassSingleton(name) => Type::ClassSingleton(rename(&name)),
        Type::Interface { name, args } => Type::Interface {
            name: rename(&name),
            args,
        },
        Type::Alias { name, args } => Type::Alias {
            name: rename(&name),
            args,
        },
        other => other,
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Type]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    f.write_str("[")?;
    write_list(f, args, ", ")?;
    f.write_str("]")
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type], sep: &str) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("untyped"),
            Type::Base(base) => f.write_str(base.keyword()),
            Type::ClassInstance { name, args }
            | Type::Interface { name, args }
            | Type::Alias { name, args } => {
                write!(f, "{}", name)?;
                write_args(f, args)
            }
            Type::ClassSingleton(name) => write!(f, "singleton({})", name),
            Type::Optional(inner) => {
                if inner.is_compound() {
                    write!(f, "({})?", inner)
                } else {
                    write!(f, "{}?", inner)
                }
            }
            Type::Union(types) => write_list(f, types, " | "),
            Type::Intersection(types) => {
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" & ")?;
                    }
                    if matches!(ty, Type::Union(_)) {
                        write!(f, "({})", ty)?;
                    } else {
                        write!(f, "{}", ty)?;
                    }
                }
                Ok(())
            }
            Type::Tuple(types) => {
                if types.is_empty() {
                    return f.write_str("[ ]");
                }
                f.write_str("[")?;
                write_list(f, types, ", ")?;
                f.write_str("]")
            }
            Type::Record(fields) => {
                if fields.is_empty() {
                    return f.write_str("{ }");
                }
                f.write_str("{ ")?;
                for (i, (key, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, ty)?;
                }
                f.write_str(" }")
            }
            Type::Literal(literal) => write!(f, "{}", literal),
            Type::Variable(name) => f.write_str(name),
            Type::Proc(method_type) => write!(f, "^{}", method_type),
        }
    }
}

// ============================================================================
// Method types
// ============================================================================

/// Return types bind tighter than overload separators.
fn write_return(f: &mut fmt::Formatter<'_>, ty: &Type) -> fmt::Result {
    if ty.is_compound() {
        write!(f, "({})", ty)
    } else {
        write!(f, "{}", ty)
    }
}

/// A parameter: its type and optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: Option<SmolStr>,
}

impl Param {
    pub fn new(ty: Type) -> Self {
        Self { ty, name: None }
    }

    fn map(&self, f: &dyn Fn(Type) -> Type) -> Self {
        Self {
            ty: self.ty.map(f),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {}", self.ty, name),
            None => write!(f, "{}", self.ty),
        }
    }
}

/// A parameter list in RBS order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    pub required: Vec<Param>,
    pub optional: Vec<Param>,
    pub rest: Option<Param>,
    pub trailing: Vec<Param>,
    pub required_keywords: Vec<(SmolStr, Param)>,
    pub optional_keywords: Vec<(SmolStr, Param)>,
    pub rest_keywords: Option<Param>,
}

impl Params {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.optional.is_empty()
            && self.rest.is_none()
            && self.trailing.is_empty()
            && self.required_keywords.is_empty()
            && self.optional_keywords.is_empty()
            && self.rest_keywords.is_none()
    }

    /// `(untyped)`: the parameters of a generated writer.
    pub fn single(ty: Type) -> Self {
        Self {
            required: vec![Param::new(ty)],
            ..Self::default()
        }
    }

    fn map(&self, f: &dyn Fn(Type) -> Type) -> Self {
        let list = |params: &[Param]| -> Vec<Param> { params.iter().map(|p| p.map(f)).collect() };
        let keywords = |params: &[(SmolStr, Param)]| -> Vec<(SmolStr, Param)> {
            params
                .iter()
                .map(|(key, p)| (key.clone(), p.map(f)))
                .collect()
        };
        Self {
            required: list(&self.required),
            optional: list(&self.optional),
            rest: self.rest.as_ref().map(|p| p.map(f)),
            trailing: list(&self.trailing),
            required_keywords: keywords(&self.required_keywords),
            optional_keywords: keywords(&self.optional_keywords),
            rest_keywords: self.rest_keywords.as_ref().map(|p| p.map(f)),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.required.iter().map(|p| p.to_string()));
        parts.extend(self.optional.iter().map(|p| format!("?{}", p)));
        if let Some(rest) = &self.rest {
            parts.push(format!("*{}", rest));
        }
        parts.extend(self.trailing.iter().map(|p| p.to_string()));
        parts.extend(
            self.required_keywords
                .iter()
                .map(|(key, p)| format!("{}: {}", key, p)),
        );
        parts.extend(
            self.optional_keywords
                .iter()
                .map(|(key, p)| format!("?{}: {}", key, p)),
        );
        if let Some(rest) = &self.rest_keywords {
            parts.push(format!("**{}", rest));
        }
        f.write_str(&parts.join(", "))
    }
}

/// A block accepted by a method: `{ (Integer) -> void }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub params: Params,
    pub return_type: Type,
    pub required: bool,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.required {
            f.write_str("?")?;
        }
        write!(f, "{{ ({}) -> ", self.params)?;
        write_return(f, &self.return_type)?;
        f.write_str(" }")
    }
}

/// A function signature: `[T] (T) { (T) -> void } -> Array[T]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodType {
    pub type_params: Vec<SmolStr>,
    pub params: Params,
    pub block: Option<Block>,
    pub return_type: Type,
}

impl MethodType {
    /// `() -> T`
    pub fn returning(return_type: Type) -> Self {
        Self {
            type_params: Vec::new(),
            params: Params::default(),
            block: None,
            return_type,
        }
    }

    /// Rebuild every type in the signature with [`Type::map`].
    pub fn map(&self, f: &dyn Fn(Type) -> Type) -> Self {
        Self {
            type_params: self.type_params.clone(),
            params: self.params.map(f),
            block: self.block.as_ref().map(|block| Block {
                params: block.params.map(f),
                return_type: block.return_type.map(f),
                required: block.required,
            }),
            return_type: self.return_type.map(f),
        }
    }

    /// Replace type variables not bound by the method's own type parameters.
    pub fn substitute(&self, subst: &Substitution) -> Self {
        if subst.is_empty() {
            return self.clone();
        }
        if !self.type_params.iter().any(|p| subst.contains_key(p)) {
            return self.map(&|ty| substitute_variable(ty, subst));
        }
        let visible: Substitution = subst
            .iter()
            .filter(|(key, _)| !self.type_params.contains(*key))
            .map(|(key, ty)| (key.clone(), ty.clone()))
            .collect();
        self.map(&|ty| substitute_variable(ty, &visible))
    }

    pub fn map_names(&self, rename: &dyn Fn(&TypeName) -> TypeName) -> Self {
        self.map(&|ty| rename_type(ty, rename))
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            write!(f, "[{}] ", self.type_params.join(", "))?;
        }
        write!(f, "({})", self.params)?;
        if let Some(block) = &self.block {
            write!(f, " {}", block)?;
        }
        f.write_str(" -> ")?;
        write_return(f, &self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> Type {
        Type::class_instance(TypeName::parse(name).unwrap())
    }

    #[test]
    fn test_method_type_display() {
        assert_eq!(MethodType::returning(class("Integer")).to_string(), "() -> Integer");

        let method_type = MethodType {
            type_params: vec![SmolStr::from("T")],
            params: Params {
                required: vec![Param {
                    ty: Type::Variable(SmolStr::from("T")),
                    name: Some(SmolStr::from("x")),
                }],
                optional_keywords: vec![(SmolStr::from("limit"), Param::new(class("Integer")))],
                ..Params::default()
            },
            block: Some(Block {
                params: Params::single(Type::Variable(SmolStr::from("T"))),
                return_type: Type::Base(BaseType::Void),
                required: false,
            }),
            return_type: Type::Optional(Box::new(Type::Union(vec![
                class("String"),
                Type::Base(BaseType::Nil),
            ]))),
        };
        assert_eq!(
            method_type.to_string(),
            "[T] (T x, ?limit: Integer) ?{ (T) -> void } -> (String | nil)?"
        );
    }

    #[test]
    fn test_type_name_of_shapes() {
        assert_eq!(class("Foo").type_name().map(|n| n.to_string()), Some("Foo".into()));
        assert!(Type::Any.type_name().is_none());
        assert!(Type::Union(vec![class("A"), class("B")]).type_name().is_none());
        assert!(Type::Variable(SmolStr::from("T")).type_name().is_none());
    }

    #[test]
    fn test_substitute_respects_method_type_params() {
        let mut subst = Substitution::default();
        subst.insert(SmolStr::from("Elem"), class("Integer"));
        subst.insert(SmolStr::from("T"), class("String"));

        let method_type = MethodType {
            type_params: vec![SmolStr::from("T")],
            params: Params::single(Type::Variable(SmolStr::from("T"))),
            block: None,
            return_type: Type::ClassInstance {
                name: TypeName::parse("Array").unwrap(),
                args: vec![Type::Variable(SmolStr::from("Elem"))],
            },
        };
        assert_eq!(
            method_type.substitute(&subst).to_string(),
            "[T] (T) -> Array[Integer]"
        );
    }

    #[test]
    fn test_literal_and_record_display() {
        let record = Type::Record(vec![
            (SmolStr::from("id"), class("Integer")),
            (SmolStr::from("kind"), Type::Literal(LiteralType::Symbol("user".into()))),
        ]);
        assert_eq!(record.to_string(), "{ id: Integer, kind: :user }");
        assert_eq!(Type::Tuple(Vec::new()).to_string(), "[ ]");
        assert_eq!(
            Type::Literal(LiteralType::Str("a\"b".into())).to_string(),
            "\"a\\\"b\""
        );
    }

    #[test]
    fn test_map_names_reaches_nested_types() {
        let ty = Type::Optional(Box::new(Type::ClassInstance {
            name: TypeName::parse("Array").unwrap(),
            args: vec![class("Invoice")],
        }));
        let renamed = ty.map_names(&|name: &TypeName| {
            if name.name == "Invoice" {
                name.in_context(&[SmolStr::from("Billing")])
            } else {
                name.clone()
            }
        });
        assert_eq!(renamed.to_string(), "Array[::Billing::Invoice]?");
    }
}
