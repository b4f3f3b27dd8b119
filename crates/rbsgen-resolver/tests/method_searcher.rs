//! Delegate signature resolution against in-memory repositories.

use std::sync::Arc;

use rbsgen_ast::NamespacePath;
use rbsgen_resolver::{resolve_delegate_signatures, Delegate, MethodSearcher, UNTYPED_SIGNATURE};
use rbsgen_types::sig::parse_method_type;
use rbsgen_types::{
    Environment, InstanceDefinition, LookupError, MethodDefinition, TypeName, TypeRepository,
};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// A repository with hand-written definitions and no inheritance.
#[derive(Default)]
struct MockRepository {
    definitions: FxHashMap<TypeName, Arc<InstanceDefinition>>,
}

impl MockRepository {
    fn define(mut self, type_name: &str, methods: &[(&str, &[&str])]) -> Self {
        let type_name = TypeName::parse(type_name).unwrap().absolute();
        let mut definition = InstanceDefinition::new(type_name.clone());
        for (method, signatures) in methods {
            let defs = signatures
                .iter()
                .map(|signature| parse_method_type(signature).unwrap())
                .collect();
            definition.methods.insert(
                SmolStr::from(*method),
                MethodDefinition {
                    name: SmolStr::from(*method),
                    defs,
                    defined_in: type_name.clone(),
                },
            );
        }
        self.definitions.insert(type_name, Arc::new(definition));
        self
    }
}

impl TypeRepository for MockRepository {
    fn instance_definition(&self, name: &TypeName) -> Result<Arc<InstanceDefinition>, LookupError> {
        self.definitions
            .get(&name.absolute())
            .cloned()
            .ok_or_else(|| LookupError::UnknownType(name.clone()))
    }
}

fn delegate(namespace: &[&str], to: &str, method: &str) -> Delegate {
    Delegate::new(NamespacePath::new(namespace.iter().copied()), to, method)
}

#[test]
fn test_resolves_forwarded_method() {
    let repo = MockRepository::default()
        .define("Foo", &[("bar", &["() -> SomeClass"])])
        .define("SomeClass", &[("foo", &["() -> Integer"])]);

    let signatures = resolve_delegate_signatures(&delegate(&["Foo"], "bar", "foo"), &repo);
    assert_eq!(signatures, vec!["() -> Integer"]);
}

#[test]
fn test_untyped_target_short_circuits() {
    let repo = MockRepository::default()
        .define("Foo", &[("bar", &["() -> String", "(Integer) -> untyped"])])
        .define("String", &[("size", &["() -> Integer"])]);

    let signatures = resolve_delegate_signatures(&delegate(&["Foo"], "bar", "size"), &repo);
    assert_eq!(signatures, vec![UNTYPED_SIGNATURE]);
}

#[test]
fn test_failed_lookups_fall_back() {
    let repo = MockRepository::default()
        .define("Foo", &[("bar", &["() -> SomeClass"]), ("list", &["() -> (A | B)"])])
        .define("SomeClass", &[("other", &["() -> Integer"])]);

    let cases = [
        delegate(&["Unknown"], "bar", "foo"),
        delegate(&[], "bar", "foo"),
        delegate(&["Foo"], "missing", "foo"),
        delegate(&["Foo"], "bar", "foo"),
        // Unions carry no single type name
        delegate(&["Foo"], "list", "foo"),
    ];
    for case in &cases {
        assert_eq!(
            resolve_delegate_signatures(case, &repo),
            vec![UNTYPED_SIGNATURE],
            "{:?}",
            case
        );
    }
}

#[test]
fn test_candidates_are_ordered_and_deduplicated() {
    let repo = MockRepository::default()
        .define(
            "Foo",
            &[("bar", &["() -> A", "(Integer) -> B?", "(String) -> A?", "() -> Missing"])],
        )
        .define("A", &[("foo", &["(Integer) -> String", "() -> String"])])
        .define("B", &[("foo", &["() -> String", "(Symbol) -> Integer"])]);

    let signatures = resolve_delegate_signatures(&delegate(&["Foo"], "bar", "foo"), &repo);
    assert_eq!(
        signatures,
        vec!["(Integer) -> String", "() -> String", "(Symbol) -> Integer"]
    );
}

#[test]
fn test_singleton_and_interface_targets() {
    let repo = MockRepository::default()
        .define("Foo", &[("klass", &["() -> singleton(Bar)"]), ("each", &["() -> _Each"])])
        .define("Bar", &[("name", &["() -> String"])])
        .define("_Each", &[("name", &["() -> Symbol"])]);

    let searcher = MethodSearcher::new(&repo);
    assert_eq!(
        searcher.method_types_for(&delegate(&["Foo"], "klass", "name")),
        vec!["() -> String"]
    );
    assert_eq!(
        searcher.method_types_for(&delegate(&["Foo"], "each", "name")),
        vec!["() -> Symbol"]
    );
}

#[test]
fn test_signature_files_end_to_end() {
    let mut env = Environment::with_core().unwrap();
    env.load_str(
        r#"
        module Shop
          class Customer
            attr_reader name: String
            def orders: () -> Array[Order]
          end

          class Order
            def customer: () -> Customer?
            def total: () -> Integer
          end
        end
        "#,
    )
    .unwrap();

    let searcher = MethodSearcher::new(&env);
    assert_eq!(
        searcher.method_types_for(&delegate(&["Shop", "Order"], "customer", "name")),
        vec!["() -> String"]
    );
    assert_eq!(
        searcher.method_types_for(&delegate(&["Shop", "Order"], "total", "succ")),
        vec!["() -> Integer"]
    );
    assert_eq!(
        searcher.method_types_for(&delegate(&["Shop", "Customer"], "orders", "first")),
        // Looked up by name only: the element type stays a variable
        vec!["() -> Elem?", "(Integer n) -> Array[Elem]"]
    );
    // Inherited from Object through Kernel
    assert_eq!(
        searcher.method_types_for(&delegate(&["Shop", "Order"], "customer", "frozen?")),
        vec!["() -> bool"]
    );
}

#[test]
fn test_nested_declarations_shadow_root_names() {
    let mut env = Environment::with_core().unwrap();
    env.load_str(
        r#"
        class Invoice
          def total: () -> String
        end

        module Billing
          class Invoice
            def total: () -> Integer
          end

          class String
            def upcase: () -> Symbol
          end

          class Account
            def invoice: () -> Invoice
            def label: () -> String
            def owner: () -> ::Invoice
          end
        end
        "#,
    )
    .unwrap();

    let resolve = |to: &str, method: &str| {
        resolve_delegate_signatures(&delegate(&["Billing", "Account"], to, method), &env)
    };
    assert_eq!(resolve("invoice", "total"), vec!["() -> Integer"]);
    assert_eq!(resolve("label", "upcase"), vec!["() -> Symbol"]);
    // Explicitly absolute names still reach the root declaration
    assert_eq!(resolve("owner", "total"), vec!["() -> String"]);
}

#[test]
fn test_repository_is_shared_across_threads() {
    let mut env = Environment::with_core().unwrap();
    env.load_str("class Counter def value: () -> Integer end").unwrap();
    let env = Arc::new(env);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let env = Arc::clone(&env);
            scope.spawn(move || {
                let signatures =
                    resolve_delegate_signatures(&delegate(&["Counter"], "value", "succ"), &*env);
                assert_eq!(signatures, vec!["() -> Integer"]);
            });
        }
    });
}
