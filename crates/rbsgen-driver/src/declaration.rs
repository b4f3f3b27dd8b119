//! Normalization of evaluated declaration calls.
//!
//! A `class_attribute` call yields one [`AttributeDeclaration`] per name and a
//! `delegate` call yields one [`DelegateDeclaration`] per forwarded method.

use indexmap::IndexMap;
use rbsgen_ast::NamespacePath;
use rbsgen_collector::{DeclarationKind, MethodCall};
use rbsgen_resolver::Delegate;
use smol_str::SmolStr;
use thiserror::Error;

use crate::eval::{eval_args, EvalError, HashKey, Value};

/// The methods one `class_attribute` name generates. The class-level reader
/// and writer always exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDeclaration {
    pub name: SmolStr,
    pub instance_reader: bool,
    pub instance_writer: bool,
    pub instance_predicate: bool,
}

/// One method generated by `delegate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateDeclaration {
    pub request: Delegate,
    /// Name of the generated method, including any prefix
    pub method_name: SmolStr,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Attribute(AttributeDeclaration),
    Delegate(DelegateDeclaration),
}

/// Why a declaration call could not be normalized.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeclarationError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("{kind} expects symbol names, found {found}")]
    InvalidName { kind: DeclarationKind, found: String },

    #[error("{0} called without names")]
    NoNames(DeclarationKind),

    #[error("delegate requires a `to:` option")]
    MissingTarget,

    #[error("invalid value for `{option}`: {found}")]
    InvalidOption { option: &'static str, found: String },
}

type Options = IndexMap<HashKey, Value>;

/// Evaluate and normalize one declaration call found in `namespace`.
pub fn normalize(
    namespace: &NamespacePath,
    call: &MethodCall,
) -> Result<Vec<Declaration>, DeclarationError> {
    let mut values = eval_args(&call.args)?;
    // The block slot carries nothing either declaration uses
    values.pop();

    let options = match values.pop() {
        Some(Value::Hash(options)) => options,
        Some(other) => {
            values.push(other);
            Options::new()
        }
        None => Options::new(),
    };

    let names = symbol_names(call.kind, &values)?;
    let declarations = match call.kind {
        DeclarationKind::ClassAttribute => class_attributes(names, &options)
            .into_iter()
            .map(Declaration::Attribute)
            .collect(),
        DeclarationKind::Delegate => delegates(namespace, names, &options, call.private)?
            .into_iter()
            .map(Declaration::Delegate)
            .collect(),
    };
    Ok(declarations)
}

fn symbol_names(kind: DeclarationKind, values: &[Value]) -> Result<Vec<SmolStr>, DeclarationError> {
    if values.is_empty() {
        return Err(DeclarationError::NoNames(kind));
    }
    values
        .iter()
        .map(|value| {
            value.as_symbol().cloned().ok_or_else(|| DeclarationError::InvalidName {
                kind,
                found: value.to_string(),
            })
        })
        .collect()
}

fn class_attributes(names: Vec<SmolStr>, options: &Options) -> Vec<AttributeDeclaration> {
    let accessor = flag(options, "instance_accessor").unwrap_or(true);
    let instance_reader = flag(options, "instance_reader").unwrap_or(accessor);
    let instance_writer = flag(options, "instance_writer").unwrap_or(accessor);
    let instance_predicate = flag(options, "instance_predicate").unwrap_or(true);

    names
        .into_iter()
        .map(|name| AttributeDeclaration {
            name,
            instance_reader,
            instance_writer,
            instance_predicate,
        })
        .collect()
}

fn delegates(
    namespace: &NamespacePath,
    names: Vec<SmolStr>,
    options: &Options,
    private_call: bool,
) -> Result<Vec<DelegateDeclaration>, DeclarationError> {
    let to = match option(options, "to") {
        Some(value) => value.as_name().cloned().ok_or_else(|| DeclarationError::InvalidOption {
            option: "to",
            found: value.to_string(),
        })?,
        None => return Err(DeclarationError::MissingTarget),
    };

    let prefix = match option(options, "prefix") {
        Some(Value::Bool(true)) => format!("{}_", to.trim_start_matches('@')),
        Some(value) if !value.is_truthy() => String::new(),
        Some(value) => match value.as_name() {
            Some(text) => format!("{}_", text),
            None => {
                return Err(DeclarationError::InvalidOption {
                    option: "prefix",
                    found: value.to_string(),
                })
            }
        },
        None => String::new(),
    };
    let private = private_call || flag(options, "private").unwrap_or(false);

    Ok(names
        .into_iter()
        .map(|method| DelegateDeclaration {
            method_name: SmolStr::from(format!("{}{}", prefix, method)),
            request: Delegate::new(namespace.clone(), to.clone(), method),
            private,
        })
        .collect())
}

fn option<'a>(options: &'a Options, name: &str) -> Option<&'a Value> {
    options.get(&HashKey::Symbol(SmolStr::from(name)))
}

fn flag(options: &Options, name: &str) -> Option<bool> {
    option(options, name).map(Value::is_truthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbsgen_collector::extract_declarations;

    fn normalize_source(source: &str) -> Vec<Result<Vec<Declaration>, DeclarationError>> {
        let result = rbsgen_parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        extract_declarations(&result.ast)
            .iter()
            .flat_map(|(namespace, calls)| calls.iter().map(move |call| normalize(namespace, call)))
            .collect()
    }

    fn attribute(name: &str, reader: bool, writer: bool, predicate: bool) -> Declaration {
        Declaration::Attribute(AttributeDeclaration {
            name: name.into(),
            instance_reader: reader,
            instance_writer: writer,
            instance_predicate: predicate,
        })
    }

    #[test]
    fn test_class_attribute_options() {
        let results = normalize_source(
            r#"
class Foo
  class_attribute :foo, :bar
  class_attribute :baz, instance_accessor: false, default: nil
  class_attribute :qux, instance_writer: false, instance_predicate: false
  class_attribute :quux, instance_accessor: false, instance_reader: true
end
"#,
        );
        let declarations: Vec<Declaration> =
            results.into_iter().map(Result::unwrap).flatten().collect();
        assert_eq!(
            declarations,
            vec![
                attribute("foo", true, true, true),
                attribute("bar", true, true, true),
                attribute("baz", false, false, true),
                attribute("qux", true, false, false),
                attribute("quux", true, false, true),
            ]
        );
    }

    #[test]
    fn test_delegate_requests() {
        let results = normalize_source(
            r#"
class Bar
  delegate :name, :email, to: :profile
  delegate :size, to: "@items", prefix: true, allow_nil: true
  delegate :title, to: :post, prefix: :article, private: true

  private

  delegate :foo, to: :bar
end
"#,
        );
        let declarations: Vec<DelegateDeclaration> = results
            .into_iter()
            .map(Result::unwrap)
            .flatten()
            .map(|declaration| match declaration {
                Declaration::Delegate(delegate) => delegate,
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        let summary: Vec<(String, String, String, bool)> = declarations
            .iter()
            .map(|d| {
                (
                    d.method_name.to_string(),
                    d.request.to.to_string(),
                    d.request.method.to_string(),
                    d.private,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("name".into(), "profile".into(), "name".into(), false),
                ("email".into(), "profile".into(), "email".into(), false),
                ("items_size".into(), "@items".into(), "size".into(), false),
                ("article_title".into(), "post".into(), "title".into(), true),
                ("foo".into(), "bar".into(), "foo".into(), true),
            ]
        );
        assert!(declarations
            .iter()
            .all(|d| d.request.namespace == NamespacePath::new(["Bar"])));
    }

    #[test]
    fn test_invalid_calls() {
        let results = normalize_source(
            r#"
delegate :foo
delegate "foo", to: :bar
delegate :foo, to: 42
delegate :foo, to: :bar, prefix: 1
class_attribute
class_attribute instance_reader: false
class_attribute :a, default: build_default
"#,
        );
        let errors: Vec<DeclarationError> = results.into_iter().map(Result::unwrap_err).collect();
        assert_eq!(errors[0], DeclarationError::MissingTarget);
        assert!(matches!(errors[1], DeclarationError::InvalidName { .. }));
        assert!(matches!(errors[2], DeclarationError::InvalidOption { option: "to", .. }));
        assert!(matches!(errors[3], DeclarationError::InvalidOption { option: "prefix", .. }));
        assert_eq!(errors[4], DeclarationError::NoNames(DeclarationKind::ClassAttribute));
        assert_eq!(errors[5], DeclarationError::NoNames(DeclarationKind::ClassAttribute));
        assert!(matches!(errors[6], DeclarationError::Eval(_)));
        assert_eq!(
            errors[1].to_string(),
            "delegate expects symbol names, found \"foo\""
        );
    }
}
