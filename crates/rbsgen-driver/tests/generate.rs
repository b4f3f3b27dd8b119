//! End-to-end generation over a directory tree.

use rbsgen_driver::{discover_sources, run, GeneratorConfig};
use std::fs;
use std::path::{Path, PathBuf};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        root,
        "app/models/user.rb",
        r#"
class User
  class_attribute :default_role, instance_writer: false

  delegate :name, :email, to: :profile
  delegate :count, to: :posts, prefix: true

  def profile
    @profile ||= Profile.new
  end
end
"#,
    );
    write(root, "app/models/profile.rb", "class Profile\n  def name; end\nend\n");
    write(root, "app/models/broken.rb", "class Broken\n  delegate :a, to: :b\n");
    write(root, "app/README.md", "not ruby");
    write(
        root,
        "sig/models.rbs",
        r#"
class User
  def profile: () -> Profile
  def posts: () -> Array[Post]
end

class Profile
  attr_reader name: String
  def email: () -> String?
end

class Post
end
"#,
    );
    write(root, "sig/invalid.rbs", "class Oops def : end");
    dir
}

#[test]
fn test_generates_signature_tree() {
    let dir = project();
    let root = dir.path();
    let output = root.join("out");
    let config = GeneratorConfig::default()
        .with_sig_path(root.join("sig"))
        .with_output_dir(&output)
        .with_jobs(2);

    let result = run(&[root.join("app")], &config).unwrap();

    assert_eq!(result.written, vec![output.join("models/user.rbs")]);
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].file.as_deref().unwrap().ends_with("broken.rb"));
    assert!(!output.join("models/profile.rbs").exists());
    assert!(!output.join("models/broken.rbs").exists());

    let rbs = fs::read_to_string(output.join("models/user.rbs")).unwrap();
    insta::assert_snapshot!(rbs, @r###"
    # resolve-type-names: false

    class User
      def self.default_role: () -> untyped
      def self.default_role=: (untyped) -> untyped
      def self.default_role?: () -> bool
      def default_role: () -> untyped
      def default_role?: () -> bool
      def name: () -> String
      def email: () -> String?
      def posts_count: () -> Integer
    end
    "###);
}

#[test]
fn test_single_file_input() {
    let dir = project();
    let root = dir.path();
    let file = root.join("app/models/user.rb");

    let inputs = discover_sources(&[file.clone()]).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].relative, PathBuf::from("user.rb"));

    let config = GeneratorConfig::default()
        .without_core()
        .with_output_dir(root.join("out"));
    let result = run(&[file], &config).unwrap();
    assert!(result.success);

    // Without any signatures every delegate falls back
    let rbs = fs::read_to_string(root.join("out/user.rbs")).unwrap();
    assert!(rbs.contains("  def name: () -> untyped\n"));
    assert!(rbs.contains("  def posts_count: () -> untyped\n"));
}

#[test]
fn test_discovery_order_and_missing_paths() {
    let dir = project();
    let root = dir.path();

    let inputs = discover_sources(&[root.join("app")]).unwrap();
    let relative: Vec<PathBuf> = inputs.into_iter().map(|input| input.relative).collect();
    assert_eq!(
        relative,
        vec![
            PathBuf::from("models/broken.rb"),
            PathBuf::from("models/profile.rb"),
            PathBuf::from("models/user.rb"),
        ]
    );

    assert!(discover_sources(&[root.join("missing")]).is_err());
}
