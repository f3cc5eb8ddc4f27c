//! Run reporters
//!
//! The runner uses a `RunReporter` trait to separate reporting from execution. This allows for custom output formats
//! (console, JSON for CI) by implementing the trait.

use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use super::runner::{CaseOutcome, RunSummary};
use crate::version::REPORTGEN_VERSION;

// ============================================================================
// Reporter Trait
// ============================================================================

/// Trait for reporting harness results.
pub trait RunReporter {
    /// Called once before any case runs
    fn on_run_start(&mut self, _case_count: usize) {}

    /// Called when a case reaches its terminal state (in table order)
    fn on_case_complete(&mut self, outcome: &CaseOutcome);

    /// Called when all cases have completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Reporter that discards everything.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl RunReporter for SilentReporter {
    fn on_case_complete(&mut self, _outcome: &CaseOutcome) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

// ============================================================================
// Console Reporter
// ============================================================================

/// Default console reporter (pytest-style).
pub struct ConsoleReporter<W: Write = io::Stderr> {
    out: W,
    verbose: bool,
    color: bool,
}

impl ConsoleReporter<io::Stderr> {
    pub fn new(verbose: bool) -> Self {
        Self {
            out: io::stderr(),
            verbose,
            color: true,
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Write to an arbitrary sink without ANSI colors.
    pub fn with_writer(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            color: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> RunReporter for ConsoleReporter<W> {
    fn on_run_start(&mut self, case_count: usize) {
        let banner = self.paint("1", "=================== golden report check ===================");
        let _ = writeln!(self.out, "{}", banner);
        let _ = writeln!(self.out, "collected {} case(s)", case_count);
        let _ = writeln!(self.out);
    }

    fn on_case_complete(&mut self, outcome: &CaseOutcome) {
        let status = if outcome.passed() {
            self.paint("32", "PASSED")
        } else {
            self.paint("31", "FAILED")
        };
        let kind = outcome
            .error
            .as_ref()
            .map(|e| format!(" [{}]", e.failure.kind()))
            .unwrap_or_default();

        if self.verbose {
            let _ = writeln!(
                self.out,
                "{} {}{} ({:.0}ms) -> {}",
                outcome.name,
                status,
                kind,
                outcome.duration.as_millis(),
                outcome.output.display()
            );
        } else {
            let _ = writeln!(self.out, "{} {}{}", outcome.name, status, kind);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let failures: Vec<&CaseOutcome> = summary.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(self.out);
            let header = self.paint("1;31", "=================== FAILURES ===================");
            let _ = writeln!(self.out, "{}", header);
            for outcome in failures {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "___________ {} ___________", outcome.name);
                if let Some(error) = &outcome.error {
                    let _ = writeln!(self.out, "    {}", error);
                }
                let _ = writeln!(
                    self.out,
                    "    generated: {}\n    reference: {}",
                    outcome.output.display(),
                    outcome.reference.display()
                );
                if let Some(diff) = &outcome.difference {
                    for line in diff.lines() {
                        let _ = writeln!(self.out, "    {}", line);
                    }
                }
            }
        }

        let _ = writeln!(self.out);
        let line = summary_line(summary.passed(), summary.failed(), summary.duration);
        let code = if summary.all_passed() { "1;32" } else { "1;31" };
        let painted = self.paint(code, &line);
        let _ = writeln!(self.out, "{}", painted);
    }
}

/// Render the closing summary line, e.g. `====== 2 passed, 1 failed in 0.42s ======`.
pub fn summary_line(passed: usize, failed: usize, duration: Duration) -> String {
    let mut parts = Vec::new();
    if passed > 0 {
        parts.push(format!("{} passed", passed));
    }
    if failed > 0 {
        parts.push(format!("{} failed", failed));
    }
    if parts.is_empty() {
        parts.push("no cases ran".to_string());
    }
    format!("====== {} in {:.2}s ======", parts.join(", "), duration.as_secs_f64())
}

// ============================================================================
// JSON Reporter
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CaseRecord {
    pub name: String,
    pub root: String,
    pub reference: String,
    pub output: String,
    pub expect: String,
    pub verdict: String,
    pub observed: Option<String>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u128,
}

impl From<&CaseOutcome> for CaseRecord {
    fn from(outcome: &CaseOutcome) -> Self {
        Self {
            name: outcome.name.clone(),
            root: outcome.root.display().to_string(),
            reference: outcome.reference.display().to_string(),
            output: outcome.output.display().to_string(),
            expect: outcome.expect.to_string(),
            verdict: outcome.verdict().to_string(),
            observed: outcome.observed.map(|m| m.to_string()),
            error_kind: outcome.error.as_ref().map(|e| e.failure.kind().to_string()),
            error: outcome.error.as_ref().map(|e| e.to_string()),
            duration_ms: outcome.duration.as_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryRecord {
    pub version: String,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u128,
    pub cases: Vec<CaseRecord>,
}

impl From<&RunSummary> for SummaryRecord {
    fn from(summary: &RunSummary) -> Self {
        Self {
            version: REPORTGEN_VERSION.to_string(),
            passed: summary.passed(),
            failed: summary.failed(),
            duration_ms: summary.duration.as_millis(),
            cases: summary.outcomes.iter().map(CaseRecord::from).collect(),
        }
    }
}

/// Writes one JSON document with every case once the run completes.
pub struct JsonReporter<W: Write = io::Stdout> {
    out: W,
}

impl JsonReporter<io::Stdout> {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for JsonReporter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RunReporter for JsonReporter<W> {
    fn on_case_complete(&mut self, _outcome: &CaseOutcome) {}

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let record = SummaryRecord::from(summary);
        match serde_json::to_string_pretty(&record) {
            Ok(json) => {
                let _ = writeln!(self.out, "{}", json);
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize run summary"),
        }
    }
}
