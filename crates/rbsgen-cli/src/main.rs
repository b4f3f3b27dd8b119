//! rbsgen CLI - RBS signatures for methods generated by `class_attribute` and `delegate`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// rbsgen - Generate RBS signatures for ActiveSupport declarations
#[derive(Parser)]
#[command(name = "rbsgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate signatures for Ruby files or directories
    Generate {
        /// Input files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Signature directory to load (repeatable; overrides RBSGEN_SIG_PATH)
        #[arg(short, long = "sig")]
        sig: Vec<PathBuf>,
        /// Output directory (default: sig/rbsgen)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Do not load the bundled core signatures
        #[arg(long)]
        no_core: bool,
    },

    /// Parse a Ruby file and show the declarations found
    Parse {
        /// Input file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tokenize a Ruby file and show tokens
    Lex {
        /// Input file
        file: PathBuf,
    },

    /// Show information about rbsgen
    Info,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    match cli.command {
        Commands::Generate {
            paths,
            sig,
            output,
            jobs,
            no_core,
        } => commands::generate::run(
            &paths,
            commands::generate::Overrides {
                sig_paths: sig,
                output_dir: output,
                jobs,
                no_core,
                verbose: cli.verbose,
            },
        ),
        Commands::Parse { file, json } => commands::parse::run(&file, json),
        Commands::Lex { file } => commands::lex::run(&file),
        Commands::Info => commands::info::run(),
    }
}
