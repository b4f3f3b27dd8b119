//! Generate command - write signatures for a source tree.

use rbsgen_driver::{GenerationError, GenerationWarning, GeneratorConfig};
use std::path::{Path, PathBuf};

use super::report;

/// Settings given on the command line. Anything set here wins over the
/// environment.
pub(crate) struct Overrides {
    pub sig_paths: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub no_core: bool,
    pub verbose: bool,
}

impl Overrides {
    fn apply(self, mut config: GeneratorConfig) -> GeneratorConfig {
        if !self.sig_paths.is_empty() {
            config.sig_paths = self.sig_paths;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        if self.no_core {
            config = config.without_core();
        }
        config.verbose(self.verbose)
    }
}

pub(crate) fn run(paths: &[PathBuf], overrides: Overrides) -> miette::Result<()> {
    let config = overrides.apply(GeneratorConfig::from_env());
    let result = rbsgen_driver::run(paths, &config)?;

    for warning in &result.warnings {
        print_diagnostic("warning", warning_parts(warning));
    }
    for error in &result.errors {
        print_diagnostic("error", error_parts(error));
    }

    for path in &result.written {
        println!("Wrote {}", path.display());
    }

    println!();
    if !result.success {
        println!(
            "Generate complete: {} error(s), {} warning(s)",
            result.errors.len(),
            result.warnings.len()
        );
        Err(miette::miette!("{} errors found", result.errors.len()))
    } else {
        println!(
            "Generate complete: {} file(s) written, {} warning(s)",
            result.written.len(),
            result.warnings.len()
        );
        Ok(())
    }
}

type Parts<'a> = (&'a str, Option<&'a str>, Option<std::ops::Range<usize>>);

fn warning_parts(warning: &GenerationWarning) -> Parts<'_> {
    (&warning.message, warning.file.as_deref(), warning.span.clone())
}

fn error_parts(error: &GenerationError) -> Parts<'_> {
    (&error.message, error.file.as_deref(), error.span.clone())
}

fn print_diagnostic(severity: &str, (message, file, span): Parts<'_>) {
    let Some(file) = file else {
        println!("  {}: {}", severity, message);
        return;
    };
    let source = std::fs::read_to_string(file).unwrap_or_default();
    let span = span.filter(|span| span.end <= source.len());
    report(severity, message, Path::new(file), &source, span);
}
