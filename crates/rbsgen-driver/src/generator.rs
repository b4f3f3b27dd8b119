//! RBS rendering of normalized declarations.

use rbsgen_ast::{NamespacePath, Span};
use rbsgen_collector::{DeclarationKind, Declarations};
use rbsgen_resolver::MethodSearcher;
use rbsgen_types::TypeRepository;
use std::fmt::{self, Write as _};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::declaration::{normalize, AttributeDeclaration, Declaration, DeclarationError, DelegateDeclaration};

/// First line of every generated file. Generated names are written as the
/// resolver found them, so the type checker must not re-resolve them.
pub const HEADER: &str = "# resolve-type-names: false";

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to render signatures: {0}")]
    Format(#[from] fmt::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A declaration call that was left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDeclaration {
    pub kind: DeclarationKind,
    pub namespace: NamespacePath,
    pub span: Span,
    pub error: DeclarationError,
}

/// The rendered signatures of one source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSignatures {
    /// `None` when nothing was declared
    pub rbs: Option<String>,
    pub skipped: Vec<SkippedDeclaration>,
}

/// Renders declarations into an RBS document.
pub struct Generator<'a> {
    searcher: MethodSearcher<'a>,
}

impl<'a> Generator<'a> {
    pub fn new(repository: &'a dyn TypeRepository) -> Self {
        Self {
            searcher: MethodSearcher::new(repository),
        }
    }

    pub fn generate(&self, declarations: &Declarations) -> Result<GeneratedSignatures, GenerateError> {
        let mut blocks = Vec::new();
        let mut skipped = Vec::new();

        for (namespace, calls) in &declarations.method_calls {
            let mut members = Vec::new();
            for call in calls {
                match normalize(namespace, call) {
                    Ok(normalized) => {
                        for declaration in &normalized {
                            self.write_members(declaration, &mut members);
                        }
                    }
                    Err(error) => {
                        warn!("Skipping {} in {}: {}", call.kind, display_namespace(namespace), error);
                        skipped.push(SkippedDeclaration {
                            kind: call.kind,
                            namespace: namespace.clone(),
                            span: call.span,
                            error,
                        });
                    }
                }
            }
            if !members.is_empty() {
                blocks.push(render_block(declarations, namespace, &members)?);
            }
        }

        if blocks.is_empty() {
            return Ok(GeneratedSignatures { rbs: None, skipped });
        }

        let mut rbs = String::new();
        writeln!(rbs, "{}", HEADER)?;
        for block in &blocks {
            writeln!(rbs)?;
            rbs.push_str(block);
        }
        Ok(GeneratedSignatures {
            rbs: Some(rbs),
            skipped,
        })
    }

    fn write_members(&self, declaration: &Declaration, members: &mut Vec<String>) {
        match declaration {
            Declaration::Attribute(attribute) => attribute_members(attribute, members),
            Declaration::Delegate(delegate) => members.push(self.delegate_member(delegate)),
        }
    }

    fn delegate_member(&self, delegate: &DelegateDeclaration) -> String {
        let signatures = self.searcher.method_types_for(&delegate.request);
        debug!(
            "{} delegates to {}.{}: {}",
            delegate.method_name,
            delegate.request.to,
            delegate.request.method,
            signatures.join(" | ")
        );
        let visibility = if delegate.private { "private " } else { "" };
        format!(
            "{}def {}: {}",
            visibility,
            delegate.method_name,
            signatures.join(" | ")
        )
    }
}

fn attribute_members(attribute: &AttributeDeclaration, members: &mut Vec<String>) {
    let name = &attribute.name;
    members.push(format!("def self.{}: () -> untyped", name));
    members.push(format!("def self.{}=: (untyped) -> untyped", name));
    if attribute.instance_predicate {
        members.push(format!("def self.{}?: () -> bool", name));
    }
    if attribute.instance_reader {
        members.push(format!("def {}: () -> untyped", name));
    }
    if attribute.instance_writer {
        members.push(format!("def {}=: (untyped) -> untyped", name));
    }
    if attribute.instance_predicate && attribute.instance_reader {
        members.push(format!("def {}?: () -> bool", name));
    }
}

fn render_block(
    declarations: &Declarations,
    namespace: &NamespacePath,
    members: &[String],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    if namespace.is_root() {
        for member in members {
            writeln!(out, "{}", member)?;
        }
        return Ok(out);
    }

    let keyword = declarations.namespace_kind(namespace).keyword();
    writeln!(out, "{} {}", keyword, namespace)?;
    for member in members {
        writeln!(out, "  {}", member)?;
    }
    writeln!(out, "end")?;
    Ok(out)
}

fn display_namespace(namespace: &NamespacePath) -> String {
    if namespace.is_root() {
        "top level".to_string()
    } else {
        namespace.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbsgen_types::Environment;

    fn generate(source: &str, signatures: &str) -> GeneratedSignatures {
        let result = rbsgen_parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let declarations = rbsgen_collector::collect(&result.ast);

        let mut env = Environment::with_core().unwrap();
        env.load_str(signatures).unwrap();
        Generator::new(&env).generate(&declarations).unwrap()
    }

    #[test]
    fn test_attributes_and_delegates() {
        let output = generate(
            r#"
class Foo
  class_attribute :foo
  class_attribute :flag, instance_accessor: false, instance_predicate: false

  delegate :succ, to: :bar

  private

  delegate :qux, to: :baz, prefix: true
end
"#,
            "class Foo\n  def bar: () -> Integer\nend\n",
        );
        assert!(output.skipped.is_empty());
        insta::assert_snapshot!(output.rbs.unwrap(), @r###"
        # resolve-type-names: false

        class Foo
          def self.foo: () -> untyped
          def self.foo=: (untyped) -> untyped
          def self.foo?: () -> bool
          def foo: () -> untyped
          def foo=: (untyped) -> untyped
          def foo?: () -> bool
          def self.flag: () -> untyped
          def self.flag=: (untyped) -> untyped
          def succ: () -> Integer
          private def baz_qux: () -> untyped
        end
        "###);
    }

    #[test]
    fn test_namespaces_keep_order_and_keyword() {
        let output = generate(
            r#"
delegate :size, to: :items

module Billing
  class Invoice
    delegate :name, to: :customer
  end

  class_attribute :currency, instance_writer: false
end

class Billing::Invoice
  delegate :upcase, to: :number
end
"#,
            r#"
module Billing
  class Customer
    def name: () -> String
  end

  class Invoice
    def customer: () -> Customer?
    def number: () -> (String | Integer)
  end
end
"#,
        );
        insta::assert_snapshot!(output.rbs.unwrap(), @r###"
        # resolve-type-names: false

        def size: () -> untyped

        class Billing::Invoice
          def name: () -> String
          def upcase: () -> untyped
        end

        module Billing
          def self.currency: () -> untyped
          def self.currency=: (untyped) -> untyped
          def self.currency?: () -> bool
          def currency: () -> untyped
          def currency?: () -> bool
        end
        "###);
    }

    #[test]
    fn test_skipped_declarations() {
        let output = generate(
            "class Foo\n  delegate :a\n  delegate :b, to: :c\nend\n",
            "",
        );
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].error, DeclarationError::MissingTarget);
        assert_eq!(output.skipped[0].namespace, NamespacePath::new(["Foo"]));
        insta::assert_snapshot!(output.rbs.unwrap(), @r###"
        # resolve-type-names: false

        class Foo
          def b: () -> untyped
        end
        "###);
    }

    #[test]
    fn test_nothing_to_generate() {
        let output = generate("class Foo\n  def bar; end\nend\n", "");
        assert_eq!(output, GeneratedSignatures::default());

        let output = generate("class Foo\n  delegate to: :bar\nend\n", "");
        assert!(output.rbs.is_none());
        assert_eq!(output.skipped.len(), 1);
    }
}
