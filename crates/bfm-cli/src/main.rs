//! bfm - command line front end for the macro expander
//!
//! # Usage
//!
//! ```bash
//! # Expand a file to stdout
//! bfm expand program.bfm
//!
//! # Expand stdin, keep comments, write the full result as JSON
//! cat program.bfm | bfm expand - --keep-comments --source-map --format json
//!
//! # Defaults from a config file, flags still win
//! bfm expand program.bfm --config bfm.yaml --max-depth 50 -o out.bf
//!
//! # List macro definitions with their call sites
//! bfm list program.bfm --format detailed
//!
//! # Exit code 1 when anything is reported
//! bfm validate program.bfm
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use commands::OptionOverrides;

#[derive(Parser)]
#[command(name = "bfm")]
#[command(version)]
#[command(about = "Expand Brainfuck macro source into plain Brainfuck")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExpandFormat {
    /// Expanded text only
    Code,
    /// Serialized expansion result
    Json,
    /// Expanded text plus diagnostics and macro summary
    Debug,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Text,
    Json,
    /// Bodies, locations and call sites
    Detailed,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand macro source
    Expand {
        /// Input file, `-` or nothing for stdin
        input: Option<PathBuf>,

        /// Write output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Copy comments through instead of stripping them
        #[arg(long)]
        keep_comments: bool,

        /// Drop output lines that contain only whitespace
        #[arg(long)]
        collapse_empty_lines: bool,

        /// Build a source map (included in json output)
        #[arg(long)]
        source_map: bool,

        /// Nested invocation ceiling
        #[arg(long, env = "BFM_MAX_DEPTH")]
        max_depth: Option<usize>,

        /// YAML or JSON options file; flags override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "code")]
        format: ExpandFormat,
    },

    /// List macro definitions
    List {
        /// Input file, `-` or nothing for stdin
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Expand and report diagnostics; fails when any are found
    Validate {
        /// Input file, `-` or nothing for stdin
        input: Option<PathBuf>,

        /// YAML or JSON options file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Expand {
            input,
            output,
            keep_comments,
            collapse_empty_lines,
            source_map,
            max_depth,
            config,
            format,
        } => {
            let overrides = OptionOverrides {
                keep_comments,
                collapse_empty_lines,
                source_map,
                max_depth,
            };
            commands::cmd_expand(
                input.as_deref(),
                output.as_deref(),
                config.as_deref(),
                &overrides,
                format,
            )
        }
        Commands::List { input, format } => commands::cmd_list(input.as_deref(), format),
        Commands::Validate { input, config } => {
            commands::cmd_validate(input.as_deref(), config.as_deref())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
