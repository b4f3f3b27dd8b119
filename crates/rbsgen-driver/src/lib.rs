//! Signature generation driver for rbsgen.
//!
//! This crate runs the full pipeline for each Ruby source file:
//! 1. Parsing
//! 2. Declaration collection
//! 3. Literal evaluation and normalization
//! 4. Delegate signature resolution
//! 5. RBS rendering and writing
//!
//! ## Example
//!
//! ```
//! use rbsgen_driver::generate_source;
//! use rbsgen_types::Environment;
//!
//! let mut env = Environment::with_core().unwrap();
//! env.load_str("class User def age: () -> Integer end").unwrap();
//!
//! let result = generate_source("class User\n  delegate :succ, to: :age\nend\n", None, &env).unwrap();
//! assert!(result.errors.is_empty());
//! assert!(result.rbs.unwrap().contains("def succ: () -> Integer"));
//! ```

pub mod config;
pub mod declaration;
pub mod eval;
pub mod generator;

pub use config::GeneratorConfig;
pub use declaration::{AttributeDeclaration, Declaration, DeclarationError, DelegateDeclaration};
pub use eval::{EvalError, HashKey, Value};
pub use generator::{GenerateError, GeneratedSignatures, Generator, SkippedDeclaration};

use rayon::prelude::*;
use rbsgen_types::{Environment, TypeRepository};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of a generation run over many files.
#[derive(Debug, Default)]
pub struct GenerationResult {
    /// Whether every file was processed without errors.
    pub success: bool,
    /// Signature files written, in input order.
    pub written: Vec<PathBuf>,
    /// Errors encountered.
    pub errors: Vec<GenerationError>,
    /// Warnings encountered.
    pub warnings: Vec<GenerationWarning>,
}

/// Result of generating signatures for one source.
#[derive(Debug, Default)]
pub struct SourceResult {
    /// Rendered signatures; `None` when there was nothing to write.
    pub rbs: Option<String>,
    /// Where the signatures were written, if they were.
    pub written: Option<PathBuf>,
    pub errors: Vec<GenerationError>,
    pub warnings: Vec<GenerationWarning>,
}

/// A generation error.
#[derive(Debug)]
pub struct GenerationError {
    pub message: String,
    pub file: Option<String>,
    pub span: Option<std::ops::Range<usize>>,
}

/// A generation warning.
#[derive(Debug)]
pub struct GenerationWarning {
    pub message: String,
    pub file: Option<String>,
    pub span: Option<std::ops::Range<usize>>,
}

/// A Ruby file to process and its path below the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    pub path: PathBuf,
    pub relative: PathBuf,
}

impl SourceInput {
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.relative).with_extension("rbs")
    }
}

/// Build the type environment: bundled core signatures, then every
/// configured signature directory. Unreadable or invalid signature files are
/// reported and skipped.
pub fn load_environment(config: &GeneratorConfig) -> miette::Result<Environment> {
    let mut env = if config.core {
        Environment::with_core()
            .map_err(|e| miette::miette!("Failed to load core signatures: {}", e))?
    } else {
        Environment::new()
    };

    for dir in &config.sig_paths {
        let report = env.load_dir(dir);
        if config.verbose {
            tracing::info!("Loaded {} signature file(s) from {}", report.files, dir.display());
        }
        for err in &report.errors {
            tracing::warn!("{}", err);
        }
    }

    Ok(env)
}

/// Generate signatures for a single file and write them to `output`.
pub fn generate_file(
    path: &Path,
    output: &Path,
    repository: &dyn TypeRepository,
) -> miette::Result<SourceResult> {
    let source =
        std::fs::read_to_string(path).map_err(|e| miette::miette!("Failed to read file: {}", e))?;

    let mut result = generate_source(&source, Some(path), repository)?;
    if let Some(rbs) = &result.rbs {
        write_signatures(output, rbs).map_err(|e| miette::miette!("{}", e))?;
        result.written = Some(output.to_path_buf());
    }
    Ok(result)
}

/// Generate signatures for source code.
pub fn generate_source(
    source: &str,
    source_path: Option<&Path>,
    repository: &dyn TypeRepository,
) -> miette::Result<SourceResult> {
    let file = source_path.map(|p| p.display().to_string());
    let mut result = SourceResult::default();

    // Phase 1: Parsing
    tracing::debug!("Parsing {}", file.as_deref().unwrap_or("<source>"));
    let parse_result = rbsgen_parser::parse(source);

    for err in &parse_result.errors {
        result.errors.push(GenerationError {
            message: err.to_string(),
            file: file.clone(),
            span: Some(err.span()),
        });
    }

    if !parse_result.errors.is_empty() {
        return Ok(result);
    }

    // Phase 2: Declaration collection
    let declarations = rbsgen_collector::collect(&parse_result.ast);
    if declarations.is_empty() {
        return Ok(result);
    }

    // Phase 3: Normalization, resolution and rendering
    let generated = Generator::new(repository)
        .generate(&declarations)
        .map_err(|e| miette::miette!("{}", e))?;

    for skipped in &generated.skipped {
        result.warnings.push(GenerationWarning {
            message: format!("Skipped {}: {}", skipped.kind, skipped.error),
            file: file.clone(),
            span: Some(skipped.span.range()),
        });
    }
    result.rbs = generated.rbs;

    Ok(result)
}

/// Ruby files named by `paths`. Directories are walked recursively in
/// file-name order.
pub fn discover_sources(paths: &[PathBuf]) -> miette::Result<Vec<SourceInput>> {
    let mut inputs = Vec::new();

    for root in paths {
        if root.is_file() {
            let relative = root
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| miette::miette!("Not a file: {}", root.display()))?;
            inputs.push(SourceInput {
                path: root.clone(),
                relative,
            });
            continue;
        }
        if !root.is_dir() {
            return Err(miette::miette!("No such file or directory: {}", root.display()));
        }

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "rb") {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            inputs.push(SourceInput {
                path: path.to_path_buf(),
                relative,
            });
        }
    }

    Ok(inputs)
}

/// Generate signatures for every Ruby file under `paths`.
pub fn run(paths: &[PathBuf], config: &GeneratorConfig) -> miette::Result<GenerationResult> {
    if config.verbose {
        tracing::info!("Loading signatures...");
    }
    let env = load_environment(config)?;

    let inputs = discover_sources(paths)?;
    if config.verbose {
        tracing::info!("Generating signatures for {} file(s)...", inputs.len());
    }

    let outcomes = match config.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| miette::miette!("Failed to start worker pool: {}", e))?
            .install(|| process_inputs(&inputs, &env, config)),
        None => process_inputs(&inputs, &env, config),
    };

    let mut result = GenerationResult::default();
    for (input, outcome) in inputs.iter().zip(outcomes) {
        match outcome {
            Ok(source_result) => {
                result.written.extend(source_result.written);
                result.errors.extend(source_result.errors);
                result.warnings.extend(source_result.warnings);
            }
            Err(err) => result.errors.push(GenerationError {
                message: err.to_string(),
                file: Some(input.path.display().to_string()),
                span: None,
            }),
        }
    }
    result.success = result.errors.is_empty();

    if config.verbose {
        tracing::info!("Wrote {} signature file(s)", result.written.len());
    }
    Ok(result)
}

fn process_inputs(
    inputs: &[SourceInput],
    env: &Environment,
    config: &GeneratorConfig,
) -> Vec<miette::Result<SourceResult>> {
    inputs
        .par_iter()
        .map(|input| generate_file(&input.path, &input.output_path(&config.output_dir), env))
        .collect()
}

fn write_signatures(output: &Path, rbs: &str) -> Result<(), GenerateError> {
    let write_error = |source| GenerateError::Write {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(output, rbs).map_err(write_error)
}
