//! Lex command - tokenize a Ruby file.

use rbsgen_ast::Span;
use rbsgen_lexer::Lexer;
use std::fs;
use std::path::Path;

const MAX_TEXT: usize = 40;

pub fn run(file: &Path) -> miette::Result<()> {
    let source =
        fs::read_to_string(file).map_err(|e| miette::miette!("Failed to read file: {}", e))?;

    println!("Tokenizing: {}\n", file.display());

    let mut token_count = 0;
    let mut error_count = 0;

    for result in Lexer::new(&source) {
        match result {
            Ok(token) => {
                let (line, col) = Span::from_range(&token.span).line_col(&source);
                let kind = format!("{:?}", token.kind);
                println!(
                    "{:>4}:{:<3}  {:24}  {:?}",
                    line,
                    col,
                    truncate(&kind, 24),
                    truncate(&source[token.span.clone()], MAX_TEXT)
                );
                token_count += 1;
            }
            Err(err) => {
                let (line, col) = Span::from_range(&err.span()).line_col(&source);
                println!("{:>4}:{:<3}  ERROR: {}", line, col, err);
                error_count += 1;
            }
        }
    }

    println!("\n{} tokens, {} errors", token_count, error_count);

    if error_count > 0 {
        Err(miette::miette!("{} lexer errors", error_count))
    } else {
        Ok(())
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
