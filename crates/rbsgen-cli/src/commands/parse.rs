//! Parse command - parse a file and show the declarations it contains.

use rbsgen_ast::Expr;
use rbsgen_collector::{collect, Declarations};
use rbsgen_driver::eval::eval_args;
use rbsgen_parser::parse;
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::report;

/// One declaration call as dumped by `--json`.
#[derive(Serialize)]
struct DeclarationDump<'a> {
    namespace: Vec<&'a str>,
    namespace_kind: &'static str,
    method: &'static str,
    private: bool,
    span: (u32, u32),
    arguments: &'a [Expr],
    block_argument: Option<&'a Expr>,
}

pub fn run(file: &Path, json: bool) -> miette::Result<()> {
    let source =
        fs::read_to_string(file).map_err(|e| miette::miette!("Failed to read file: {}", e))?;

    let result = parse(&source);
    let declarations = collect(&result.ast);

    if json {
        let dump = dump(&declarations);
        let text = serde_json::to_string_pretty(&dump)
            .map_err(|e| miette::miette!("Failed to serialize declarations: {}", e))?;
        println!("{}", text);
    } else {
        println!("Parsing: {}\n", file.display());

        if !result.errors.is_empty() {
            println!("Errors:");
            for err in &result.errors {
                report("error", &err.to_string(), file, &source, Some(err.span()));
            }
            println!();
        }

        println!("Declarations:");
        print_declarations(&declarations, &source);

        let calls: usize = declarations.method_calls.values().map(Vec::len).sum();
        println!("\n{} declarations, {} errors", calls, result.errors.len());
    }

    if !result.errors.is_empty() {
        Err(miette::miette!("{} parse errors", result.errors.len()))
    } else {
        Ok(())
    }
}

fn dump(declarations: &Declarations) -> Vec<DeclarationDump<'_>> {
    declarations
        .method_calls
        .iter()
        .flat_map(|(namespace, calls)| {
            calls.iter().map(move |call| DeclarationDump {
                namespace: namespace.segments().iter().map(|s| s.as_str()).collect(),
                namespace_kind: if namespace.is_root() {
                    "top"
                } else {
                    declarations.namespace_kind(namespace).keyword()
                },
                method: call.name(),
                private: call.private,
                span: (call.span.start, call.span.end),
                arguments: &call.args.positional,
                block_argument: call.args.block_arg.as_deref(),
            })
        })
        .collect()
}

fn print_declarations(declarations: &Declarations, source: &str) {
    for (namespace, calls) in &declarations.method_calls {
        if namespace.is_root() {
            println!("  (top level)");
        } else {
            println!(
                "  {} {}",
                declarations.namespace_kind(namespace).keyword(),
                namespace
            );
        }

        for call in calls {
            let (line, _) = call.span.line_col(source);
            let visibility = if call.private { "private " } else { "" };
            let args = match eval_args(&call.args) {
                Ok(values) => values
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                Err(err) => format!("<{}>", err),
            };
            println!("    {:4} | {}{}({})", line, visibility, call.name(), args);
        }
    }
}
