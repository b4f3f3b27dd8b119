//! Info command - show what rbsgen understands.

pub(crate) fn run() -> miette::Result<()> {
    println!("rbsgen");
    println!("======");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Components:");
    println!("  rbsgen-lexer      - Ruby tokenization");
    println!("  rbsgen-parser     - Ruby syntax trees");
    println!("  rbsgen-collector  - class_attribute / delegate discovery");
    println!("  rbsgen-types      - RBS types and signature loading");
    println!("  rbsgen-resolver   - Delegate signature resolution");
    println!("  rbsgen-driver     - Generation pipeline");
    println!();

    println!("Declarations:");
    println!("  class_attribute :name, ... [instance_accessor:, instance_reader:,");
    println!("                              instance_writer:, instance_predicate:]");
    println!("  delegate :name, ..., to: :target [prefix:, private:]");
    println!();

    println!("Environment:");
    println!("  RBSGEN_SIG_PATH    Signature directories ({} separated)", path_separator());
    println!("  RBSGEN_OUTPUT_DIR  Output directory (default: {})", rbsgen_driver::config::DEFAULT_OUTPUT_DIR);
    println!("  RBSGEN_JOBS        Worker threads");

    Ok(())
}

fn path_separator() -> &'static str {
    if cfg!(windows) {
        "';'"
    } else {
        "':'"
    }
}
