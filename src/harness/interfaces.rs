//! Harness I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the two operations the runner depends on:
//! - Report generation (drive the external analysis engine for one root)
//! - Report comparison (classify a generated report against its reference)
//!
//! The runner only talks to these traits, so tests can substitute a deterministic fake engine and the CLI can pick a
//! comparator at runtime. Default implementations live in `engine.rs` and `compare.rs`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reportgen_core::{ContentMatch, first_line_difference, render_line_diff};
use thiserror::Error;

use super::case::TestCase;

/// Maximum number of differing lines rendered into a failure report.
pub const MAX_DIFF_LINES: usize = 12;

/// Errors produced while generating a report
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid root '{}': {reason}", .root.display())]
    InvalidRoot { root: PathBuf, reason: String },

    #[error("cannot write report to '{}': {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analysis engine failed: {0}")]
    AnalysisFailure(String),

    #[error("analysis engine timed out after {}s", .limit.as_secs_f64())]
    Timeout { limit: Duration },

    #[error("setup command failed: {0}")]
    Setup(String),
}

impl GenerationError {
    /// Short, stable identifier used in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidRoot { .. } => "invalid-root",
            GenerationError::WriteFailure { .. } => "write-failure",
            GenerationError::AnalysisFailure(_) => "analysis-failure",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::Setup(_) => "setup-failure",
        }
    }
}

/// Errors produced while comparing a generated report against its reference
#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("generated report '{}' is missing", .0.display())]
    MissingGenerated(PathBuf),

    #[error("reference report '{}' is missing", .0.display())]
    MissingReference(PathBuf),

    #[error("comparison tool error: {0}")]
    ToolError(String),
}

impl ComparisonError {
    pub fn kind(&self) -> &'static str {
        match self {
            ComparisonError::MissingGenerated(_) => "missing-generated",
            ComparisonError::MissingReference(_) => "missing-reference",
            ComparisonError::ToolError(_) => "comparison-tool-error",
        }
    }
}

// ============================================================================
// Report Generator Interface
// ============================================================================

/// Drive the external analysis engine for one project root.
///
/// Implementations must be synchronous and must leave either a complete report at `output` or nothing new there:
/// a failed run never leaves a truncated file behind.
pub trait ReportGenerator {
    /// Generate a report for `root` at `output`.
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError>;

    /// Generate the report for a configured case.
    ///
    /// The default ignores per-case options and delegates to [`ReportGenerator::generate`]. Engines that honor
    /// case arguments, environment or setup commands override this.
    fn generate_case(&self, case: &TestCase, output: &Path) -> Result<(), GenerationError> {
        self.generate(&case.root, output)
    }
}

impl<T: ReportGenerator + ?Sized> ReportGenerator for &T {
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError> {
        (**self).generate(root, output)
    }

    fn generate_case(&self, case: &TestCase, output: &Path) -> Result<(), GenerationError> {
        (**self).generate_case(case, output)
    }
}

impl<T: ReportGenerator + ?Sized> ReportGenerator for Box<T> {
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError> {
        (**self).generate(root, output)
    }

    fn generate_case(&self, case: &TestCase, output: &Path) -> Result<(), GenerationError> {
        (**self).generate_case(case, output)
    }
}

// ============================================================================
// Comparator Interface
// ============================================================================

/// Classify a generated report against its reference.
pub trait Comparator {
    /// Compare the two files by content.
    ///
    /// Either file missing is a [`ComparisonError`], never [`ContentMatch::Different`].
    fn compare(&self, generated: &Path, reference: &Path) -> Result<ContentMatch, ComparisonError>;

    /// Render a short line diff for failure reports. `None` if either side cannot be read or the files match.
    fn describe_difference(&self, generated: &Path, reference: &Path) -> Option<String> {
        let expected = fs::read(reference).ok()?;
        let actual = fs::read(generated).ok()?;
        let expected = String::from_utf8_lossy(&expected);
        let actual = String::from_utf8_lossy(&actual);

        let first = first_line_difference(&expected, &actual)?;
        let rendered = render_line_diff(&expected, &actual, MAX_DIFF_LINES);
        if rendered.is_empty() {
            Some("reports differ only in line endings or trailing newline".to_string())
        } else {
            Some(format!("{}\n{}", first, rendered))
        }
    }
}

impl<T: Comparator + ?Sized> Comparator for &T {
    fn compare(&self, generated: &Path, reference: &Path) -> Result<ContentMatch, ComparisonError> {
        (**self).compare(generated, reference)
    }

    fn describe_difference(&self, generated: &Path, reference: &Path) -> Option<String> {
        (**self).describe_difference(generated, reference)
    }
}

impl<T: Comparator + ?Sized> Comparator for Box<T> {
    fn compare(&self, generated: &Path, reference: &Path) -> Result<ContentMatch, ComparisonError> {
        (**self).compare(generated, reference)
    }

    fn describe_difference(&self, generated: &Path, reference: &Path) -> Option<String> {
        (**self).describe_difference(generated, reference)
    }
}
