//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::path::Path;

use crate::config::{ComparatorKind, ReportgenConfig};
use crate::harness::{
    CommandGenerator, Comparator, ConsoleReporter, DiffToolComparator, GoldenRunner, InProcessComparator,
    JsonReporter, RunOptions, RunReporter, RunSummary,
};

use super::{CliError, CliResult, ExitCode, RunArgs};

/// Load the case table and switch into its directory.
///
/// Case roots, references and the output directory are written relative to the config file, exactly as they are
/// handed to the engine, so the harness runs from there.
pub fn load_config(path: &Path) -> CliResult<ReportgenConfig> {
    let config = ReportgenConfig::load(path)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        env::set_current_dir(dir)
            .map_err(|e| CliError::usage(format!("Error: cannot enter '{}': {}", dir.display(), e)))?;
        tracing::debug!(dir = %dir.display(), "changed working directory");
    }
    Ok(config)
}

/// Run options from the config, with command-line overrides applied.
pub fn run_options(config: &ReportgenConfig, run: &RunArgs, clean: bool) -> RunOptions {
    let mut options = config.harness.run_options();
    options.parallel |= run.parallel;
    if let Some(jobs) = run.jobs {
        options.jobs = Some(usize::from(jobs));
    }
    options.clean_passing = clean;
    options
}

fn comparator(config: &ReportgenConfig) -> Box<dyn Comparator + Send + Sync> {
    match &config.harness.comparator {
        ComparatorKind::InProcess => Box::new(InProcessComparator),
        ComparatorKind::DiffTool { program, args } => {
            Box::new(DiffToolComparator::new(program.clone()).with_args(args.iter().cloned()))
        }
    }
}

/// Regenerate and compare the selected cases.
pub fn verify(config: &ReportgenConfig, run: &RunArgs, clean: bool, json: bool, verbose: bool) -> CliResult<ExitCode> {
    let cases = config.select(&run.names)?;
    let runner = GoldenRunner::with_options(
        CommandGenerator::from_config(&config.engine),
        comparator(config),
        run_options(config, run, clean),
    );

    let mut reporter: Box<dyn RunReporter> = if json {
        Box::new(JsonReporter::new())
    } else {
        Box::new(ConsoleReporter::new(verbose))
    };
    let summary = runner.verify(&cases, reporter.as_mut());
    Ok(exit_code_for(&summary))
}

/// Exit code for a finished run.
pub fn exit_code_for(summary: &RunSummary) -> ExitCode {
    if summary.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Overwrite the selected cases' references with fresh engine output.
pub fn bless(config: &ReportgenConfig, run: &RunArgs) -> CliResult<ExitCode> {
    let cases = config.select(&run.names)?;
    let runner = GoldenRunner::with_options(
        CommandGenerator::from_config(&config.engine),
        InProcessComparator,
        run_options(config, run, false),
    );

    let outcomes = runner.bless(&cases);
    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.error {
            None => eprintln!("\x1b[32m✓\x1b[0m {} -> {}", outcome.name, outcome.reference.display()),
            Some(e) => {
                failed += 1;
                eprintln!("\x1b[31m✗\x1b[0m {}: {}", outcome.name, e);
            }
        }
    }

    if failed > 0 {
        Err(CliError::failure(format!("{} of {} reference(s) could not be regenerated", failed, outcomes.len())))
    } else {
        eprintln!("{} reference(s) regenerated", outcomes.len());
        Ok(ExitCode::SUCCESS)
    }
}

/// Print the case table.
pub fn list(config: &ReportgenConfig, json: bool) -> CliResult<ExitCode> {
    if json {
        println!("{}", config.names_json());
        return Ok(ExitCode::SUCCESS);
    }

    let width = config.cases.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for case in &config.cases {
        if case.description.is_empty() {
            println!("{:width$}  {} -> {}", case.name, case.root.display(), case.reference.display());
        } else {
            println!("{:width$}  {}", case.name, case.description);
        }
    }
    Ok(ExitCode::SUCCESS)
}
