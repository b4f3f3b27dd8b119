//! The declaration-collecting tree walk.

use rbsgen_ast::{Body, CallExpr, Child, ConstPath, Expr, ExprKind, NamespacePath, SourceFile};
use rustc_hash::FxHashMap;

use crate::call::{DeclarationKind, MethodCall, NamespaceKind, Visibility};
use crate::DeclarationMap;

/// Everything the collector found in one or more files.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub method_calls: DeclarationMap,
    pub namespace_kinds: FxHashMap<NamespacePath, NamespaceKind>,
}

impl Declarations {
    pub fn is_empty(&self) -> bool {
        self.method_calls.is_empty()
    }

    /// The keyword a namespace was opened with. Paths that were only ever
    /// reopened through a compound name default to `class`.
    pub fn namespace_kind(&self, path: &NamespacePath) -> NamespaceKind {
        self.namespace_kinds
            .get(path)
            .copied()
            .unwrap_or(NamespaceKind::Class)
    }

    /// Append another file's declarations. Namespaces already present keep
    /// their position.
    pub fn merge(&mut self, other: Declarations) {
        for (namespace, calls) in other.method_calls {
            self.method_calls.entry(namespace).or_default().extend(calls);
        }
        for (path, kind) in other.namespace_kinds {
            self.namespace_kinds.entry(path).or_insert(kind);
        }
    }
}

/// Lexical state at a point in the walk. Never mutated in place: nested
/// scopes receive a modified copy.
#[derive(Debug, Clone, Default)]
struct WalkContext {
    namespace: NamespacePath,
    visibility: Visibility,
}

impl WalkContext {
    /// A fresh `class`/`module` body: new namespace, public visibility.
    fn enter(&self, name: &ConstPath) -> Self {
        Self {
            namespace: self.namespace.nested(name),
            visibility: Visibility::Public,
        }
    }

    fn with_visibility(&self, visibility: Visibility) -> Self {
        Self {
            namespace: self.namespace.clone(),
            visibility,
        }
    }
}

/// Walks syntax trees and accumulates declaration calls.
#[derive(Debug, Default)]
pub struct Collector {
    method_calls: DeclarationMap,
    namespace_kinds: FxHashMap<NamespacePath, NamespaceKind>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declarations found so far, grouped by namespace.
    pub fn method_calls(&self) -> &DeclarationMap {
        &self.method_calls
    }

    pub fn visit_file(&mut self, file: &SourceFile) {
        self.visit_body(&file.body, &WalkContext::default());
    }

    pub fn finish(self) -> Declarations {
        Declarations {
            method_calls: self.method_calls,
            namespace_kinds: self.namespace_kinds,
        }
    }

    /// Visit a statement sequence. A bare visibility call affects the
    /// statements after it in this body only.
    fn visit_body(&mut self, body: &Body, ctx: &WalkContext) {
        let mut ctx = ctx.clone();
        for statement in &body.statements {
            if let Some(visibility) = visibility_change(statement) {
                ctx = ctx.with_visibility(visibility);
                continue;
            }
            self.visit_expr(statement, &ctx);
        }
    }

    fn visit_expr(&mut self, expr: &Expr, ctx: &WalkContext) {
        match &expr.node {
            ExprKind::Class(class) => {
                if let Some(superclass) = &class.superclass {
                    self.visit_expr(superclass, ctx);
                }
                let inner = ctx.enter(&class.name);
                self.record_namespace(&inner.namespace, NamespaceKind::Class);
                self.visit_body(&class.body, &inner);
            }
            ExprKind::Module(module) => {
                let inner = ctx.enter(&module.name);
                self.record_namespace(&inner.namespace, NamespaceKind::Module);
                self.visit_body(&module.body, &inner);
            }
            ExprKind::SingletonClass(sclass) => {
                // `class << self` keeps the namespace but starts public
                self.visit_expr(&sclass.target, ctx);
                self.visit_body(&sclass.body, &ctx.with_visibility(Visibility::Public));
            }
            ExprKind::Call(call) => {
                if let Some(kind) = declaration_kind(call) {
                    self.record(kind, call, expr, ctx);
                }
                self.visit_children(&expr.node, ctx);
            }
            other => self.visit_children(other, ctx),
        }
    }

    fn visit_children(&mut self, kind: &ExprKind, ctx: &WalkContext) {
        for child in kind.children() {
            match child {
                Child::Expr(expr) => self.visit_expr(expr, ctx),
                Child::Body(body) => self.visit_body(body, ctx),
            }
        }
    }

    fn record(&mut self, kind: DeclarationKind, call: &CallExpr, expr: &Expr, ctx: &WalkContext) {
        let method_call = MethodCall {
            kind,
            args: call.args.clone(),
            private: ctx.visibility == Visibility::Private,
            span: expr.span,
        };
        self.method_calls
            .entry(ctx.namespace.clone())
            .or_default()
            .push(method_call);
    }

    fn record_namespace(&mut self, path: &NamespacePath, kind: NamespaceKind) {
        self.namespace_kinds.entry(path.clone()).or_insert(kind);
    }
}

/// A receiver-less `class_attribute`/`delegate` call.
fn declaration_kind(call: &CallExpr) -> Option<DeclarationKind> {
    if call.receiver.is_some() {
        return None;
    }
    DeclarationKind::from_method_name(&call.name.node)
}

/// A statement that is exactly `private`, `public` or `protected`.
fn visibility_change(statement: &Expr) -> Option<Visibility> {
    match &statement.node {
        ExprKind::Call(call) if call.is_bare() => Visibility::from_method_name(&call.name.node),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &str) -> Declarations {
        let result = rbsgen_parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let mut collector = Collector::new();
        collector.visit_file(&result.ast);
        collector.finish()
    }

    #[test]
    fn test_visibility_does_not_leak_out_of_namespace() {
        let decls = collect(
            "module Outer\n  class Inner\n    private\n  end\n  delegate :a, to: :b\nend\n",
        );
        let calls = &decls.method_calls[&NamespacePath::new(["Outer"])];
        assert!(!calls[0].private);
    }

    #[test]
    fn test_namespace_kinds_are_recorded() {
        let decls = collect("module A\n  class B\n    delegate :x, to: :y\n  end\nend\n");
        assert_eq!(
            decls.namespace_kind(&NamespacePath::new(["A"])),
            NamespaceKind::Module
        );
        assert_eq!(
            decls.namespace_kind(&NamespacePath::new(["A", "B"])),
            NamespaceKind::Class
        );
    }

    #[test]
    fn test_merge_appends_to_existing_namespace() {
        let mut first = collect("class Foo\n  delegate :a, to: :b\nend\n");
        let second = collect("class Bar\n  delegate :c, to: :d\nend\nclass Foo\n  delegate :e, to: :f\nend\n");
        first.merge(second);

        let keys: Vec<_> = first.method_calls.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["Foo", "Bar"]);
        assert_eq!(first.method_calls[&NamespacePath::new(["Foo"])].len(), 2);
    }

    #[test]
    fn test_receiver_calls_are_ignored() {
        let decls = collect("class Foo\n  self.delegate :a, to: :b\n  Other.class_attribute :x\nend\n");
        assert!(decls.is_empty());
    }
}
