//! Literal evaluation of declaration arguments.

use indexmap::IndexMap;
use rbsgen_ast::{Arguments, Expr, ExprKind, HashEntry, Literal, Span};
use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

/// A literal value as it appears in a declaration call.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmolStr),
    Symbol(SmolStr),
    Array(Vec<Value>),
    Hash(IndexMap<HashKey, Value>),
}

/// Values that can key a hash literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Nil,
    Bool(bool),
    Int(i64),
    Str(SmolStr),
    Symbol(SmolStr),
}

impl Value {
    /// Ruby truthiness: everything except `nil` and `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_symbol(&self) -> Option<&SmolStr> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// The text of a symbol or string.
    pub fn as_name(&self) -> Option<&SmolStr> {
        match self {
            Value::Symbol(name) | Value::Str(name) => Some(name),
            _ => None,
        }
    }
}

impl From<HashKey> for Value {
    fn from(key: HashKey) -> Self {
        match key {
            HashKey::Nil => Value::Nil,
            HashKey::Bool(b) => Value::Bool(b),
            HashKey::Int(n) => Value::Int(n),
            HashKey::Str(s) => Value::Str(s),
            HashKey::Symbol(s) => Value::Symbol(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::Symbol(s) => write!(f, ":{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                if entries.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {} => {}", Value::from(key.clone()), value)?;
                }
                write!(f, " }}")
            }
        }
    }
}

/// An argument the evaluator cannot reduce to a literal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unsupported expression in declaration arguments")]
    Unsupported { span: Span },

    #[error("unsupported hash key")]
    UnsupportedKey { span: Span },

    #[error("interpolated strings are not literals")]
    Interpolated { span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::Unsupported { span }
            | EvalError::UnsupportedKey { span }
            | EvalError::Interpolated { span } => *span,
        }
    }
}

/// Evaluate every argument slot of a call. The trailing block slot is
/// `nil` when the call has no block argument.
pub fn eval_args(args: &Arguments) -> Result<Vec<Value>, EvalError> {
    args.raw()
        .map(|slot| match slot {
            Some(expr) => eval_expr(expr),
            None => Ok(Value::Nil),
        })
        .collect()
}

/// Evaluate a single literal expression.
pub fn eval_expr(expr: &Expr) -> Result<Value, EvalError> {
    let value = match &expr.node {
        ExprKind::Nil => Value::Nil,
        ExprKind::True => Value::Bool(true),
        ExprKind::False => Value::Bool(false),
        ExprKind::Literal(literal) => eval_literal(literal, expr.span)?,
        ExprKind::Array(items) => Value::Array(items.iter().map(eval_expr).collect::<Result<_, _>>()?),
        ExprKind::Hash(entries) => Value::Hash(eval_hash(entries, expr.span)?),
        ExprKind::Paren(body) if body.statements.len() == 1 => return eval_expr(&body.statements[0]),
        _ => return Err(EvalError::Unsupported { span: expr.span }),
    };
    Ok(value)
}

fn eval_literal(literal: &Literal, span: Span) -> Result<Value, EvalError> {
    let value = match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str { interpolated: true, .. } => return Err(EvalError::Interpolated { span }),
        Literal::Str { value, .. } => Value::Str(value.clone()),
        Literal::Symbol(name) => Value::Symbol(name.clone()),
    };
    Ok(value)
}

fn eval_hash(entries: &[HashEntry], span: Span) -> Result<IndexMap<HashKey, Value>, EvalError> {
    let mut hash = IndexMap::new();
    for entry in entries {
        match entry {
            HashEntry::Pair { key, value } => {
                let key = hash_key(eval_expr(key)?, key.span)?;
                // Later duplicates win but keep the first position
                hash.insert(key, eval_expr(value)?);
            }
            HashEntry::DoubleSplat(inner) => match eval_expr(inner)? {
                Value::Hash(other) => hash.extend(other),
                _ => return Err(EvalError::Unsupported { span }),
            },
        }
    }
    Ok(hash)
}

fn hash_key(value: Value, span: Span) -> Result<HashKey, EvalError> {
    let key = match value {
        Value::Nil => HashKey::Nil,
        Value::Bool(b) => HashKey::Bool(b),
        Value::Int(n) => HashKey::Int(n),
        Value::Str(s) => HashKey::Str(s),
        Value::Symbol(s) => HashKey::Symbol(s),
        Value::Float(_) | Value::Array(_) | Value::Hash(_) => {
            return Err(EvalError::UnsupportedKey { span })
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbsgen_collector::extract_declarations;

    fn first_call_args(source: &str) -> Result<Vec<Value>, EvalError> {
        let result = rbsgen_parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let declarations = extract_declarations(&result.ast);
        let (_, calls) = declarations.first().expect("no declarations");
        eval_args(&calls[0].args)
    }

    #[test]
    fn test_symbols_and_options() {
        let values =
            first_call_args("class Foo\n  class_attribute :baz, instance_accessor: false, default: nil\nend\n")
                .unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], Value::Symbol("baz".into()));
        assert_eq!(values[2], Value::Nil);

        let Value::Hash(options) = &values[1] else {
            panic!("expected options hash, got {}", values[1]);
        };
        assert_eq!(
            options.get(&HashKey::Symbol("instance_accessor".into())),
            Some(&Value::Bool(false))
        );
        assert_eq!(options.get(&HashKey::Symbol("default".into())), Some(&Value::Nil));
    }

    #[test]
    fn test_nested_literals() {
        let values = first_call_args(
            "delegate :a, to: \"b\", extra: [1, 2.5, :c, { \"k\" => true }], **{ allow_nil: true }\n",
        )
        .unwrap();
        assert_eq!(
            values[1].to_string(),
            r#"{ :to => "b", :extra => [1, 2.5, :c, { "k" => true }], :allow_nil => true }"#
        );
    }

    #[test]
    fn test_block_slot_is_nil_without_block() {
        let values = first_call_args("delegate(:a, to: :b)\n").unwrap();
        assert_eq!(values.last(), Some(&Value::Nil));
    }

    #[test]
    fn test_non_literals_are_rejected() {
        let err = first_call_args("delegate :a, to: compute_target\n").unwrap_err();
        assert!(matches!(err, EvalError::Unsupported { .. }));

        let err = first_call_args("delegate :\"a\", to: \"#{prefix}_b\"\n").unwrap_err();
        assert!(matches!(err, EvalError::Interpolated { .. }));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Str(SmolStr::default()).is_truthy());
    }
}
