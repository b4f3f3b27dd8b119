//! Instance definitions built from signature files.

use rbsgen_types::{Environment, LookupError, TypeName, TypeRepository};
use std::fs;

fn name(text: &str) -> TypeName {
    TypeName::parse(text).unwrap()
}

fn signatures(repo: &dyn TypeRepository, type_name: &str, method: &str) -> Vec<String> {
    let definition = repo.instance_definition(&name(type_name)).unwrap();
    match definition.method(method) {
        Some(method) => method.defs.iter().map(|d| d.to_string()).collect(),
        None => Vec::new(),
    }
}

#[test]
fn test_core_signatures_load() {
    let env = Environment::with_core().unwrap();
    assert_eq!(signatures(&env, "Integer", "succ"), vec!["() -> Integer"]);
    // Inherited through Numeric and Object
    assert_eq!(signatures(&env, "Integer", "zero?"), vec!["() -> bool"]);
    assert_eq!(signatures(&env, "Integer", "inspect"), vec!["() -> String"]);
    assert_eq!(signatures(&env, "String", "is_instance_of?"), vec!["(Module klass) -> bool"]);
}

#[test]
fn test_generic_ancestors_are_substituted() {
    let env = Environment::with_core().unwrap();
    assert_eq!(
        signatures(&env, "Array", "first"),
        vec!["() -> Elem?", "(Integer n) -> Array[Elem]"]
    );

    let mut env = env;
    env.load_str(
        r#"
        class Tags < Array[String]
        end
        "#,
    )
    .unwrap();
    assert_eq!(
        signatures(&env, "Tags", "first"),
        vec!["() -> String?", "(Integer n) -> Array[String]"]
    );
    assert_eq!(
        signatures(&env, "Tags", "map"),
        vec!["[U] () { (String) -> U } -> Array[U]"]
    );
}

#[test]
fn test_superclass_includes_and_own_methods() {
    let mut env = Environment::new();
    env.load_str(
        r#"
        module Named
          def name: () -> String
          def label: () -> String
        end

        class Base
          def id: () -> Integer
          def label: () -> Symbol
        end

        class User < Base
          include Named
          def id: () -> String
          def to_s: () -> String | ...
        end
        "#,
    )
    .unwrap();

    // Own definitions win over inherited ones
    assert_eq!(signatures(&env, "User", "id"), vec!["() -> String"]);
    // Included modules win over the superclass
    assert_eq!(signatures(&env, "User", "label"), vec!["() -> String"]);
    assert_eq!(signatures(&env, "User", "name"), vec!["() -> String"]);
    assert_eq!(signatures(&env, "User", "to_s"), vec!["() -> String"]);

    let definition = env.instance_definition(&name("User")).unwrap();
    assert_eq!(
        definition.method("name").map(|m| m.defined_in.to_string()),
        Some("::Named".to_string())
    );
}

#[test]
fn test_overloading_appends_inherited() {
    let mut env = Environment::new();
    env.load_str(
        r#"
        class Base
          def fetch: (Integer) -> String
        end
        class Child < Base
          def fetch: (Symbol) -> String | ...
        end
        "#,
    )
    .unwrap();
    assert_eq!(
        signatures(&env, "Child", "fetch"),
        vec!["(Symbol) -> String", "(Integer) -> String"]
    );
}

#[test]
fn test_attributes_and_aliases() {
    let mut env = Environment::new();
    env.load_str(
        r#"
        class Account
          attr_reader balance: Integer
          attr_writer note: String
          attr_accessor owner: String?
          attr_reader self.count: Integer
          alias amount balance
          def self.find: (Integer) -> Account
        end
        "#,
    )
    .unwrap();
    assert_eq!(signatures(&env, "Account", "balance"), vec!["() -> Integer"]);
    assert_eq!(signatures(&env, "Account", "amount"), vec!["() -> Integer"]);
    assert_eq!(signatures(&env, "Account", "note"), Vec::<String>::new());
    assert_eq!(signatures(&env, "Account", "note="), vec!["(String note) -> String"]);
    assert_eq!(signatures(&env, "Account", "owner"), vec!["() -> String?"]);
    assert_eq!(signatures(&env, "Account", "owner="), vec!["(String? owner) -> String?"]);
    // Singleton members stay off the instance side
    assert!(signatures(&env, "Account", "count").is_empty());
    assert!(signatures(&env, "Account", "find").is_empty());
}

#[test]
fn test_interfaces_and_type_aliases() {
    let mut env = Environment::new();
    env.load_str(
        r#"
        interface _Named
          def name: () -> String
        end
        interface _Person
          include _Named
          def age: () -> Integer
        end
        class Box end
        type person = _Person
        type boxed = Box
        type id = Integer | String
        class Legacy = Box
        "#,
    )
    .unwrap();

    assert_eq!(signatures(&env, "_Person", "name"), vec!["() -> String"]);
    assert_eq!(signatures(&env, "person", "age"), vec!["() -> Integer"]);
    assert!(env.instance_definition(&name("boxed")).is_ok());
    assert!(env.instance_definition(&name("Legacy")).is_ok());
    assert!(matches!(
        env.instance_definition(&name("id")),
        Err(LookupError::Malformed { .. })
    ));
}

#[test]
fn test_lookup_errors() {
    let mut env = Environment::new();
    env.load_str(
        r#"
        class Loop1 < Loop2 end
        class Loop2 < Loop1 end
        class Orphan < Missing end
        class BadAlias
          alias nothing missing
        end
        "#,
    )
    .unwrap();

    assert!(matches!(
        env.instance_definition(&name("Nope")),
        Err(LookupError::UnknownType(_))
    ));
    assert!(matches!(
        env.instance_definition(&name("Loop1")),
        Err(LookupError::Cyclic(_))
    ));
    assert!(matches!(
        env.instance_definition(&name("Orphan")),
        Err(LookupError::Malformed { .. })
    ));
    assert!(matches!(
        env.instance_definition(&name("BadAlias")),
        Err(LookupError::Malformed { .. })
    ));
}

#[test]
fn test_load_dir_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("models")).unwrap();
    fs::write(
        dir.path().join("models/user.rbs"),
        "class User\n  def name: () -> String\nend\n",
    )
    .unwrap();
    fs::write(dir.path().join("broken.rbs"), "class Broken\n  def oops\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "class Ignored end").unwrap();

    let mut env = Environment::new();
    let report = env.load_dir(dir.path());
    assert_eq!(report.files, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].to_string().contains("broken.rbs"));
    assert_eq!(signatures(&env, "User", "name"), vec!["() -> String"]);
    assert!(!env.contains(&name("Ignored")));

    let missing = env.load_dir(&dir.path().join("missing"));
    assert!(!missing.is_ok());
}
