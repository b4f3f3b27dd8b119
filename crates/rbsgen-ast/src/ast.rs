//! Syntax tree node definitions.

use crate::{Span, Spanned};
use smol_str::SmolStr;

/// A complete Ruby source file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceFile {
    /// Top-level statements
    pub body: Body,
    /// Full span of the file
    pub span: Span,
}

/// A sequence of statements: a file, a class body, a method body, a branch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Body {
    /// Statements in source order
    pub statements: Vec<Expr>,
    /// Span of the entire body
    pub span: Span,
}

impl Body {
    /// Create an empty body.
    pub fn empty(span: Span) -> Self {
        Self {
            statements: Vec::new(),
            span,
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression. Every Ruby statement is an expression.
pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExprKind {
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `self`
    SelfRef,
    /// Literal value
    Literal(Literal),
    /// Array literal: `[1, :a]`, `%i[a b]`
    Array(Vec<Expr>),
    /// Hash literal, braced or the brace-less trailing hash of a call
    Hash(Vec<HashEntry>),
    /// Constant reference: `Foo`, `Foo::Bar`, `::Foo`
    Const(ConstPath),
    /// Bare identifier that could be a local or a method call
    Ident(SmolStr),
    /// `@ivar`, `@@cvar`, `$gvar`
    Variable(Variable),
    /// Method call, with or without receiver
    Call(CallExpr),
    /// `class Foo < Bar ... end`
    Class(ClassDef),
    /// `module Foo ... end`
    Module(ModuleDef),
    /// `class << self ... end`
    SingletonClass(SingletonClassDef),
    /// `def foo(a) ... end`
    Def(MethodDef),
    /// `x = 1`, `@a ||= []`
    Assign(AssignExpr),
    /// `a + b`, `a && b`
    Binary(BinaryExpr),
    /// `!a`, `-a`, `not a`
    Unary(UnaryExpr),
    /// `*args`
    Splat(Box<Expr>),
    /// `if`/`unless`, statement or modifier form
    If(IfExpr),
    /// `while`/`until`, statement or modifier form
    While(WhileExpr),
    /// `case ... when ... end`
    Case(CaseExpr),
    /// `begin ... rescue ... ensure ... end`
    Begin(BeginExpr),
    /// `return x`
    Return(Option<Box<Expr>>),
    /// `yield a, b`
    Yield(Vec<Expr>),
    /// `->(x) { x }`
    Lambda(BlockExpr),
    /// `(expr)`
    Paren(Body),
    /// Something the parser skipped during error recovery
    Error,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    /// Integer: `42`
    Int(i64),
    /// Float: `3.5`
    Float(f64),
    /// String: `"hello"`; interpolated strings keep their raw text
    Str { value: SmolStr, interpolated: bool },
    /// Symbol: `:name`
    Symbol(SmolStr),
}

/// An element of a hash literal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HashEntry {
    /// `key => value` or `key: value` (the key is then a symbol literal)
    Pair { key: Expr, value: Expr },
    /// `**opts`
    DoubleSplat(Expr),
}

/// A constant path: `Foo::Bar`, `::Foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstPath {
    /// Whether the path starts with `::`
    pub absolute: bool,
    /// Names from outermost to innermost
    pub segments: Vec<SmolStr>,
}

impl std::fmt::Display for ConstPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.absolute {
            f.write_str("::")?;
        }
        f.write_str(&self.segments.join("::"))
    }
}

/// A sigil-prefixed variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub kind: VariableKind,
    /// Name including the sigil
    pub name: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableKind {
    Instance,
    Class,
    Global,
}

// ============================================================================
// Calls
// ============================================================================

/// A method call: `foo`, `foo(1)`, `obj.foo 1, 2 do ... end`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallExpr {
    /// Explicit receiver; `None` for calls on the implicit `self`
    pub receiver: Option<Box<Expr>>,
    /// Method name
    pub name: Spanned<SmolStr>,
    /// Arguments as written
    pub args: Arguments,
    /// Literal block: `do |x| ... end` or `{ |x| ... }`
    pub block: Option<BlockExpr>,
    /// Whether the call used `&.`
    pub safe_navigation: bool,
}

impl CallExpr {
    /// A call with no receiver, no arguments and no block, such as a bare
    /// `private`.
    pub fn is_bare(&self) -> bool {
        self.receiver.is_none() && self.args.is_empty() && self.block.is_none()
    }
}

/// The argument list of a call.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arguments {
    /// Positional arguments. Trailing `key: value` pairs written without
    /// braces are collected into a single [`ExprKind::Hash`] element.
    pub positional: Vec<Expr>,
    /// `&blk` / `&:sym` block argument
    pub block_arg: Option<Box<Expr>>,
    /// Whether the list was written in parentheses
    pub parenthesized: bool,
}

impl Arguments {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.block_arg.is_none()
    }

    /// Every argument slot in order, ending with the block-argument slot
    /// (`None` when the call has no `&blk`).
    pub fn raw(&self) -> impl Iterator<Item = Option<&Expr>> + '_ {
        self.positional
            .iter()
            .map(Some)
            .chain(std::iter::once(self.block_arg.as_deref()))
    }

    /// Number of raw slots, including the block-argument slot.
    pub fn raw_len(&self) -> usize {
        self.positional.len() + 1
    }
}

/// A literal block or lambda body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockExpr {
    /// Block parameters: `|a, b|`
    pub params: Vec<Param>,
    /// Block body
    pub body: Body,
    /// Span of the entire block
    pub span: Span,
}

// ============================================================================
// Definitions
// ============================================================================

/// A class definition: `class Foo::Bar < Base`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassDef {
    /// Class name as written
    pub name: Spanned<ConstPath>,
    /// Optional superclass expression
    pub superclass: Option<Box<Expr>>,
    /// Class body
    pub body: Body,
}

/// A module definition: `module Foo`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleDef {
    /// Module name as written
    pub name: Spanned<ConstPath>,
    /// Module body
    pub body: Body,
}

/// A singleton class body: `class << self`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingletonClassDef {
    /// The object whose singleton class is opened
    pub target: Box<Expr>,
    /// Body
    pub body: Body,
}

/// A method definition: `def foo(a, b = 1)` or `def self.foo`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDef {
    /// Receiver for singleton methods (`def self.foo`)
    pub receiver: Option<Box<Expr>>,
    /// Method name, including `=`/`?`/`!` suffixes
    pub name: Spanned<SmolStr>,
    /// Parameters
    pub params: Vec<Param>,
    /// Method body
    pub body: Body,
}

/// A method or block parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    /// Parameter name (anonymous `*`, `**` and `&` have none)
    pub name: Option<SmolStr>,
    pub kind: ParamKind,
    /// Default value for optional positional and keyword parameters
    pub default: Option<Expr>,
    /// Span of the entire parameter
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKind {
    /// `a`
    Required,
    /// `a = 1`
    Optional,
    /// `*rest`
    Rest,
    /// `key:` or `key: 1`
    Keyword,
    /// `**opts`
    KeywordRest,
    /// `&blk`
    Block,
}

// ============================================================================
// Statements
// ============================================================================

/// An assignment: `x = 1`, `self.foo += 2`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssignExpr {
    pub target: Box<Expr>,
    pub op: AssignOp,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssignOp {
    Assign,    // =
    AddAssign, // +=
    SubAssign, // -=
    OrAssign,  // ||=
    AndAssign, // &&=
}

/// A binary expression: `a + b`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: Spanned<BinaryOp>,
    pub right: Box<Expr>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Mod, // %
    Pow, // **
    // Comparison
    Eq,        // ==
    CaseEq,    // ===
    Ne,        // !=
    Lt,        // <
    Gt,        // >
    Le,        // <=
    Ge,        // >=
    Cmp,       // <=>
    Match,     // =~
    Shl,       // <<
    // Logical
    And, // && / and
    Or,  // || / or
    // Ranges
    Range,          // ..
    ExclusiveRange, // ...
}

/// A unary expression: `!x`, `-x`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnaryExpr {
    pub op: Spanned<UnaryOp>,
    pub operand: Box<Expr>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    Neg, // -
    Not, // ! / not
}

/// `if`/`unless`; `negated` is set for `unless`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Body,
    /// `else` body; `elsif` chains nest another `If` in here
    pub else_branch: Option<Body>,
    pub negated: bool,
}

/// `while`/`until`; `negated` is set for `until`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhileExpr {
    pub condition: Box<Expr>,
    pub body: Body,
    pub negated: bool,
}

/// `case subject when a, b then ... else ... end`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseExpr {
    pub subject: Option<Box<Expr>>,
    pub whens: Vec<WhenClause>,
    pub else_branch: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhenClause {
    pub patterns: Vec<Expr>,
    pub body: Body,
}

/// `begin ... rescue ... else ... ensure ... end`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeginExpr {
    pub body: Body,
    pub rescues: Vec<RescueClause>,
    pub else_branch: Option<Body>,
    pub ensure: Option<Body>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RescueClause {
    /// Exception classes: `rescue Foo, Bar`
    pub exceptions: Vec<Expr>,
    /// Bound variable: `=> e`
    pub binding: Option<SmolStr>,
    pub body: Body,
}

// ============================================================================
// Traversal
// ============================================================================

/// A direct child of an expression.
///
/// Bodies are reported separately from plain expressions because statement
/// sequences carry state (visibility) that single expressions do not.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Expr(&'a Expr),
    Body(&'a Body),
}

impl ExprKind {
    /// The direct children of this node in source order.
    ///
    /// Class, module and singleton-class bodies are included; callers that
    /// track namespaces handle those variants before falling back to this.
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut out = Vec::new();
        match self {
            ExprKind::Nil
            | ExprKind::True
            | ExprKind::False
            | ExprKind::SelfRef
            | ExprKind::Literal(_)
            | ExprKind::Const(_)
            | ExprKind::Ident(_)
            | ExprKind::Variable(_)
            | ExprKind::Error => {}
            ExprKind::Array(items) | ExprKind::Yield(items) => {
                out.extend(items.iter().map(Child::Expr));
            }
            ExprKind::Hash(entries) => {
                for entry in entries {
                    match entry {
                        HashEntry::Pair { key, value } => {
                            out.push(Child::Expr(key));
                            out.push(Child::Expr(value));
                        }
                        HashEntry::DoubleSplat(value) => out.push(Child::Expr(value)),
                    }
                }
            }
            ExprKind::Call(call) => {
                if let Some(receiver) = &call.receiver {
                    out.push(Child::Expr(receiver));
                }
                out.extend(call.args.positional.iter().map(Child::Expr));
                if let Some(block_arg) = &call.args.block_arg {
                    out.push(Child::Expr(block_arg));
                }
                if let Some(block) = &call.block {
                    push_params(&mut out, &block.params);
                    out.push(Child::Body(&block.body));
                }
            }
            ExprKind::Class(class) => {
                if let Some(superclass) = &class.superclass {
                    out.push(Child::Expr(superclass));
                }
                out.push(Child::Body(&class.body));
            }
            ExprKind::Module(module) => out.push(Child::Body(&module.body)),
            ExprKind::SingletonClass(sclass) => {
                out.push(Child::Expr(&sclass.target));
                out.push(Child::Body(&sclass.body));
            }
            ExprKind::Def(def) => {
                if let Some(receiver) = &def.receiver {
                    out.push(Child::Expr(receiver));
                }
                push_params(&mut out, &def.params);
                out.push(Child::Body(&def.body));
            }
            ExprKind::Assign(assign) => {
                out.push(Child::Expr(&assign.target));
                out.push(Child::Expr(&assign.value));
            }
            ExprKind::Binary(binary) => {
                out.push(Child::Expr(&binary.left));
                out.push(Child::Expr(&binary.right));
            }
            ExprKind::Unary(unary) => out.push(Child::Expr(&unary.operand)),
            ExprKind::Splat(inner) => out.push(Child::Expr(inner)),
            ExprKind::Return(value) => {
                if let Some(value) = value {
                    out.push(Child::Expr(value));
                }
            }
            ExprKind::If(if_expr) => {
                out.push(Child::Expr(&if_expr.condition));
                out.push(Child::Body(&if_expr.then_branch));
                if let Some(else_branch) = &if_expr.else_branch {
                    out.push(Child::Body(else_branch));
                }
            }
            ExprKind::While(while_expr) => {
                out.push(Child::Expr(&while_expr.condition));
                out.push(Child::Body(&while_expr.body));
            }
            ExprKind::Case(case) => {
                if let Some(subject) = &case.subject {
                    out.push(Child::Expr(subject));
                }
                for when in &case.whens {
                    out.extend(when.patterns.iter().map(Child::Expr));
                    out.push(Child::Body(&when.body));
                }
                if let Some(else_branch) = &case.else_branch {
                    out.push(Child::Body(else_branch));
                }
            }
            ExprKind::Begin(begin) => {
                out.push(Child::Body(&begin.body));
                for rescue in &begin.rescues {
                    out.extend(rescue.exceptions.iter().map(Child::Expr));
                    out.push(Child::Body(&rescue.body));
                }
                if let Some(else_branch) = &begin.else_branch {
                    out.push(Child::Body(else_branch));
                }
                if let Some(ensure) = &begin.ensure {
                    out.push(Child::Body(ensure));
                }
            }
            ExprKind::Lambda(block) => {
                push_params(&mut out, &block.params);
                out.push(Child::Body(&block.body));
            }
            ExprKind::Paren(body) => out.push(Child::Body(body)),
        }
        out
    }
}

fn push_params<'a>(out: &mut Vec<Child<'a>>, params: &'a [Param]) {
    out.extend(
        params
            .iter()
            .filter_map(|p| p.default.as_ref())
            .map(Child::Expr),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Expr {
        Spanned::new(
            ExprKind::Literal(Literal::Symbol(SmolStr::from(name))),
            Span::default(),
        )
    }

    #[test]
    fn test_raw_arguments_end_with_block_slot() {
        let args = Arguments {
            positional: vec![sym("foo"), sym("bar")],
            block_arg: None,
            parenthesized: false,
        };
        let raw: Vec<_> = args.raw().collect();
        assert_eq!(raw.len(), 3);
        assert_eq!(args.raw_len(), 3);
        assert!(raw[2].is_none());
    }

    #[test]
    fn test_call_children_include_block_body() {
        let call = ExprKind::Call(CallExpr {
            receiver: None,
            name: Spanned::new(SmolStr::from("included"), Span::default()),
            args: Arguments::default(),
            block: Some(BlockExpr {
                params: Vec::new(),
                body: Body {
                    statements: vec![sym("x")],
                    span: Span::default(),
                },
                span: Span::default(),
            }),
            safe_navigation: false,
        });
        let children = call.children();
        assert_eq!(children.len(), 1);
        assert!(matches!(children[0], Child::Body(body) if body.statements.len() == 1));
    }

    #[test]
    fn test_const_path_display() {
        let path = ConstPath {
            absolute: true,
            segments: vec![SmolStr::from("Foo"), SmolStr::from("Bar")],
        };
        assert_eq!(path.to_string(), "::Foo::Bar");
    }
}
