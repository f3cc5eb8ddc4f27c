//! The case table entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reportgen_core::{ExpectedOutcome, derive_output_path};

/// One (root, reference) pair plus the per-case engine options.
///
/// Cases are built once from the configured table and never mutated during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Unique case name (used for selection and reporting)
    pub name: String,
    /// One-line description shown by `reportgen list`
    pub description: String,
    /// Project root handed to the engine
    pub root: PathBuf,
    /// Committed reference report
    pub reference: PathBuf,
    /// Extra engine arguments placed after the root
    pub args: Vec<String>,
    /// Environment applied to the engine (and setup) process
    pub env: BTreeMap<String, String>,
    /// Command run before generation, as argv
    pub setup: Option<Vec<String>>,
    /// Per-case override of the harness-wide expected outcome
    pub expect: Option<ExpectedOutcome>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, reference: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            root: root.into(),
            reference: reference.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            setup: None,
            expect: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_setup<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_expect(mut self, expect: ExpectedOutcome) -> Self {
        self.expect = Some(expect);
        self
    }

    /// The policy this case is judged by, falling back to the harness default.
    pub fn expected_outcome(&self, default: ExpectedOutcome) -> ExpectedOutcome {
        self.expect.unwrap_or(default)
    }

    /// Where the generated report for this case lands, under `output_dir`.
    pub fn output_path(&self, output_dir: &Path, suffix: &str) -> PathBuf {
        output_dir.join(derive_output_path(&self.root, &self.reference, suffix))
    }
}
