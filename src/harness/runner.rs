//! Golden comparison runner
//!
//! For every case in the table the runner derives the output path, asks the [`ReportGenerator`] for a fresh report,
//! compares it against the committed reference and maps the comparison to a verdict:
//!
//! ```text
//! Pending -> Generating -> Comparing -> Passed | Failed
//! ```
//!
//! Cases share no mutable state. Each one writes to its own derived path, so they may run on parallel workers
//! (rayon); results are always reported in table order. A failing case never stops the others.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use reportgen_core::{CaseState, ContentMatch, ExpectedOutcome, Verdict, WORKFLOW_SUFFIX, normalize_path};
use thiserror::Error;

use super::case::TestCase;
use super::interfaces::{Comparator, ComparisonError, GenerationError, ReportGenerator};
use super::reporter::RunReporter;

// ============================================================================
// Outcomes
// ============================================================================

/// Why a case failed.
#[derive(Debug, Error)]
pub enum CaseFailure {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("comparison failed: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("expected the generated report to be {expected} to the reference, but it was {observed}")]
    PolicyViolation {
        expected: ExpectedOutcome,
        observed: ContentMatch,
    },

    #[error("generated report would overwrite its reference '{}'", .0.display())]
    OutputIsReference(PathBuf),

    #[error("case panicked: {0}")]
    Panicked(String),
}

impl CaseFailure {
    /// Short, stable identifier of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CaseFailure::Generation(e) => e.kind(),
            CaseFailure::Comparison(e) => e.kind(),
            CaseFailure::PolicyViolation { .. } => "policy-violation",
            CaseFailure::OutputIsReference(_) => "output-is-reference",
            CaseFailure::Panicked(_) => "panicked",
        }
    }
}

/// A case failure with the case's root attached.
#[derive(Debug, Error)]
#[error("{}: {failure}", .root.display())]
pub struct CaseError {
    pub root: PathBuf,
    #[source]
    pub failure: CaseFailure,
}

/// Result of verifying a single case.
#[derive(Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub root: PathBuf,
    pub reference: PathBuf,
    pub output: PathBuf,
    pub expect: ExpectedOutcome,
    /// Terminal state (`Passed` or `Failed`)
    pub state: CaseState,
    /// Comparison result, when comparison ran to completion
    pub observed: Option<ContentMatch>,
    pub error: Option<CaseError>,
    /// Rendered line diff for content mismatches
    pub difference: Option<String>,
    pub duration: Duration,
}

impl CaseOutcome {
    pub fn verdict(&self) -> Verdict {
        if self.state == CaseState::Passed { Verdict::Pass } else { Verdict::Fail }
    }

    pub fn passed(&self) -> bool {
        self.verdict().is_pass()
    }
}

/// Aggregate of a verify run, in table order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<CaseOutcome>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

/// Result of regenerating one reference.
#[derive(Debug)]
pub struct BlessOutcome {
    pub name: String,
    pub reference: PathBuf,
    pub error: Option<CaseError>,
    pub duration: Duration,
}

// ============================================================================
// Runner
// ============================================================================

/// Options shared by every case of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory derived output paths are placed under
    pub output_dir: PathBuf,
    /// Suffix appended to the root's final segment
    pub suffix: String,
    /// Harness-wide expected outcome (cases may override)
    pub expect: ExpectedOutcome,
    /// Run cases on a rayon pool
    pub parallel: bool,
    /// Pool size when `parallel`; rayon's default when `None`
    pub jobs: Option<usize>,
    /// Remove generated reports of passing cases
    pub clean_passing: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            suffix: WORKFLOW_SUFFIX.to_string(),
            expect: ExpectedOutcome::Identical,
            parallel: false,
            jobs: None,
            clean_passing: false,
        }
    }
}

/// Orchestrates generation and comparison over a case table.
pub struct GoldenRunner<G, C> {
    generator: G,
    comparator: C,
    options: RunOptions,
}

impl<G, C> GoldenRunner<G, C>
where
    G: ReportGenerator + Sync,
    C: Comparator + Sync,
{
    pub fn new(generator: G, comparator: C) -> Self {
        Self::with_options(generator, comparator, RunOptions::default())
    }

    pub fn with_options(generator: G, comparator: C, options: RunOptions) -> Self {
        Self {
            generator,
            comparator,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Output path for a case; a pure function of the case and the run options.
    pub fn output_path_for(&self, case: &TestCase) -> PathBuf {
        case.output_path(&self.options.output_dir, &self.options.suffix)
    }

    /// Verify every case and report outcomes in table order.
    #[tracing::instrument(skip_all, fields(cases = cases.len(), parallel = self.options.parallel))]
    pub fn verify(&self, cases: &[TestCase], reporter: &mut dyn RunReporter) -> RunSummary {
        let start = Instant::now();
        reporter.on_run_start(cases.len());

        let outcomes = if self.options.parallel {
            let outcomes = self.map_parallel(cases, |case| self.verify_isolated(case));
            for outcome in &outcomes {
                reporter.on_case_complete(outcome);
            }
            outcomes
        } else {
            cases
                .iter()
                .map(|case| {
                    let outcome = self.verify_isolated(case);
                    reporter.on_case_complete(&outcome);
                    outcome
                })
                .collect()
        };

        let summary = RunSummary {
            outcomes,
            duration: start.elapsed(),
        };
        reporter.on_run_complete(&summary);
        summary
    }

    /// Verify a single case. Never panics on case errors; they are recorded in the outcome.
    pub fn verify_case(&self, case: &TestCase) -> CaseOutcome {
        let start = Instant::now();
        let output = self.output_path_for(case);
        let expect = case.expected_outcome(self.options.expect);
        let mut outcome = CaseOutcome {
            name: case.name.clone(),
            root: case.root.clone(),
            reference: case.reference.clone(),
            output: output.clone(),
            expect,
            state: CaseState::Pending,
            observed: None,
            error: None,
            difference: None,
            duration: Duration::ZERO,
        };

        advance(&mut outcome, CaseState::Generating);
        if normalize_path(&output) == normalize_path(&case.reference) {
            return fail(outcome, case, CaseFailure::OutputIsReference(case.reference.clone()), start);
        }
        if let Err(e) = self.generator.generate_case(case, &output) {
            return fail(outcome, case, e.into(), start);
        }

        advance(&mut outcome, CaseState::Comparing);
        let observed = match self.comparator.compare(&output, &case.reference) {
            Ok(observed) => observed,
            Err(e) => return fail(outcome, case, e.into(), start),
        };
        outcome.observed = Some(observed);

        match expect.verdict(observed) {
            Verdict::Pass => {
                advance(&mut outcome, CaseState::Passed);
                if self.options.clean_passing {
                    remove_generated(&output);
                }
                outcome.duration = start.elapsed();
                outcome
            }
            Verdict::Fail => {
                if observed == ContentMatch::Different {
                    outcome.difference = self.comparator.describe_difference(&output, &case.reference);
                }
                fail(outcome, case, CaseFailure::PolicyViolation { expected: expect, observed }, start)
            }
        }
    }

    /// [`Self::verify_case`] with a panicking generator or comparator recorded as a failure of that case only.
    fn verify_isolated(&self, case: &TestCase) -> CaseOutcome {
        let start = Instant::now();
        panic::catch_unwind(AssertUnwindSafe(|| self.verify_case(case))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!(case = %case.name, %message, "case panicked");
            CaseOutcome {
                name: case.name.clone(),
                root: case.root.clone(),
                reference: case.reference.clone(),
                output: self.output_path_for(case),
                expect: case.expected_outcome(self.options.expect),
                state: CaseState::Failed,
                observed: None,
                error: Some(CaseError {
                    root: case.root.clone(),
                    failure: CaseFailure::Panicked(message),
                }),
                difference: None,
                duration: start.elapsed(),
            }
        })
    }

    /// Regenerate each case's reference in place through the generator.
    #[tracing::instrument(skip_all, fields(cases = cases.len()))]
    pub fn bless(&self, cases: &[TestCase]) -> Vec<BlessOutcome> {
        let bless_one = |case: &TestCase| {
            let start = Instant::now();
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| self.generator.generate_case(case, &case.reference))) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(CaseFailure::from(e)),
                Err(payload) => Some(CaseFailure::Panicked(panic_message(payload.as_ref()))),
            };
            let error = failure.map(|failure| CaseError {
                root: case.root.clone(),
                failure,
            });
            BlessOutcome {
                name: case.name.clone(),
                reference: case.reference.clone(),
                error,
                duration: start.elapsed(),
            }
        };

        if self.options.parallel {
            self.map_parallel(cases, bless_one)
        } else {
            cases.iter().map(bless_one).collect()
        }
    }

    /// Map over cases on a rayon pool, preserving input order.
    fn map_parallel<T, F>(&self, cases: &[TestCase], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&TestCase) -> T + Sync + Send,
    {
        match self.options.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| cases.par_iter().map(&f).collect()),
                Err(e) => {
                    tracing::warn!(error = %e, "could not build a {}-thread pool; using the global pool", jobs);
                    cases.par_iter().map(&f).collect()
                }
            },
            None => cases.par_iter().map(&f).collect(),
        }
    }
}

fn advance(outcome: &mut CaseOutcome, next: CaseState) {
    debug_assert!(outcome.state.can_advance_to(next), "{} -> {}", outcome.state, next);
    tracing::debug!(case = %outcome.name, from = %outcome.state, to = %next, "case state");
    outcome.state = next;
}

fn fail(mut outcome: CaseOutcome, case: &TestCase, failure: CaseFailure, start: Instant) -> CaseOutcome {
    advance(&mut outcome, CaseState::Failed);
    tracing::debug!(case = %case.name, kind = failure.kind(), "case failed");
    outcome.error = Some(CaseError {
        root: case.root.clone(),
        failure,
    });
    outcome.duration = start.elapsed();
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "thread panicked".to_string())
}

fn remove_generated(output: &Path) {
    if let Err(e) = fs::remove_file(output) {
        tracing::warn!(output = %output.display(), error = %e, "could not remove generated report");
    }
}
