//! CLI commands.

pub mod generate;
pub mod info;
pub mod lex;
pub mod parse;

use rbsgen_ast::Span;
use std::ops::Range;
use std::path::Path;

/// Print a diagnostic with its location and the offending source line.
pub(crate) fn report(
    severity: &str,
    message: &str,
    file: &Path,
    source: &str,
    span: Option<Range<usize>>,
) {
    println!("  {}: {}", severity, message);
    let Some(span) = span else {
        println!("   --> {}", file.display());
        return;
    };

    let (line, col) = Span::from_range(&span).line_col(source);
    println!("   --> {}:{}:{}", file.display(), line, col);
    if let Some(text) = source.lines().nth(line - 1) {
        println!("    |");
        println!("{:4} | {}", line, text);
        println!("    |");
    }
}
