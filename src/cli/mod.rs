//! CLI module for the golden report harness
//!
//! ## Commands
//!
//! - `verify` - Regenerate every report and compare it with its reference
//! - `bless` - Overwrite references with the engine's current output
//! - `list` - Print the case table
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::version::REPORTGEN_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// At least one case failed
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The harness could not run (bad config, unknown case)
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<crate::config::ConfigError> for CliError {
    fn from(e: crate::config::ConfigError) -> Self {
        CliError::usage(format!("Error: {}", e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Golden-file regression harness for the report generator
#[derive(Parser, Debug)]
#[command(name = "reportgen")]
#[command(version = REPORTGEN_VERSION)]
#[command(about = "Regenerate analysis reports and compare them with committed references", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Case table to load
    #[arg(long, short = 'c', global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Verbose output (per-case timings, debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Options shared by commands that run the engine.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Only run the named case (repeatable)
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub names: Vec<String>,

    /// Run cases on parallel workers
    #[arg(long)]
    pub parallel: bool,

    /// Worker count for --parallel
    #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate every report and compare it with its reference
    Verify {
        #[command(flatten)]
        run: RunArgs,
        /// Remove generated reports of passing cases
        #[arg(long)]
        clean: bool,
        /// Print a JSON summary on stdout instead of the console report
        #[arg(long)]
        json: bool,
    },

    /// Overwrite reference reports with the engine's current output
    Bless {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the case table
    List {
        /// Print case names as a JSON array
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run(cli: Cli) {
    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = commands::load_config(&cli.config)?;
    match cli.command {
        Command::Verify { run, clean, json } => commands::verify(&config, &run, clean, json, cli.verbose),
        Command::Bless { run } => commands::bless(&config, &run),
        Command::List { json } => commands::list(&config, json),
    }
}

// ============================================================================
// Tests
// ============================================================================
