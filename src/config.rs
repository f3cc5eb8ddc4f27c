//! Case table configuration
//!
//! The harness reads a static, explicitly enumerated table of cases from a TOML file (`reportgen.toml` by default).
//! There is no discovery: a case exists only if it is listed.
//!
//! ```toml
//! [engine]
//! program = "aderyn"
//! args = ["--skip-update-check"]
//! timeout_secs = 900
//!
//! [harness]
//! suffix = "-workflow"
//! expect = "identical"
//!
//! [[cases]]
//! name = "contract-playground"
//! root = "tests/contract-playground"
//! reference = "reports/report.md"
//! ```
//!
//! Paths are used as written and are interpreted relative to the directory the harness runs in; the CLI switches to
//! the config file's directory before running.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reportgen_core::{ExpectedOutcome, ParseExpectedOutcomeError, WORKFLOW_SUFFIX, normalize_path};
use serde::Deserialize;
use thiserror::Error;

use crate::harness::{RunOptions, TestCase};

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "reportgen.toml";

/// Errors produced while loading or validating the case table
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config lists no cases")]
    NoCases,

    #[error("case #{index}: field '{field}' must not be empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("duplicate case name '{0}'")]
    DuplicateName(String),

    #[error("cases '{first}' and '{second}' both write to '{}'", .path.display())]
    DuplicateOutput { first: String, second: String, path: PathBuf },

    #[error("cases '{first}' and '{second}' share the reference '{}'", .path.display())]
    DuplicateReference { first: String, second: String, path: PathBuf },

    #[error("case '{case}' would write its generated report over the reference of case '{owner}' ('{}')", .path.display())]
    OutputIsReference { case: String, owner: String, path: PathBuf },

    #[error("{context}: {source}")]
    InvalidExpectation {
        context: String,
        #[source]
        source: ParseExpectedOutcomeError,
    },

    #[error("unknown comparator '{0}' (expected 'in-process' or 'diff-tool')")]
    UnknownComparator(String),

    #[error("engine program must not be empty")]
    EmptyProgram,

    #[error("harness jobs must be at least 1")]
    InvalidJobs,

    #[error("unknown case '{name}'. Available cases: {}", .available.join(", "))]
    UnknownCase { name: String, available: Vec<String> },
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    engine: RawEngine,
    #[serde(default)]
    harness: RawHarness,
    #[serde(default)]
    cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEngine {
    program: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    output_flag: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawHarness {
    output_dir: Option<PathBuf>,
    suffix: Option<String>,
    expect: Option<String>,
    comparator: Option<String>,
    diff_program: Option<String>,
    diff_args: Option<Vec<String>>,
    parallel: bool,
    jobs: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCase {
    name: String,
    #[serde(default)]
    description: String,
    root: PathBuf,
    reference: PathBuf,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    setup: Option<Vec<String>>,
    #[serde(default)]
    expect: Option<String>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// How the external engine is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    /// Arguments placed before the root
    pub args: Vec<String>,
    /// Flag that introduces the output path (`-o` by default)
    pub output_flag: String,
    pub timeout: Option<Duration>,
}

/// Which comparator the harness uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparatorKind {
    InProcess,
    DiffTool { program: String, args: Vec<String> },
}

/// Harness-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    pub output_dir: PathBuf,
    pub suffix: String,
    pub expect: ExpectedOutcome,
    pub comparator: ComparatorKind,
    pub parallel: bool,
    pub jobs: Option<usize>,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            suffix: WORKFLOW_SUFFIX.to_string(),
            expect: ExpectedOutcome::Identical,
            comparator: ComparatorKind::InProcess,
            parallel: false,
            jobs: None,
        }
    }
}

impl HarnessSettings {
    /// Runner options for these settings.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            output_dir: self.output_dir.clone(),
            suffix: self.suffix.clone(),
            expect: self.expect,
            parallel: self.parallel,
            jobs: self.jobs,
            clean_passing: false,
        }
    }
}

/// The validated case table and its settings.
#[derive(Debug, Clone)]
pub struct ReportgenConfig {
    pub engine: EngineConfig,
    pub harness: HarnessSettings,
    pub cases: Vec<TestCase>,
}

impl ReportgenConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), cases = config.cases.len(), "loaded case table");
        Ok(config)
    }

    /// Parse and validate config text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        resolve(raw)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }

    /// Select cases by name, keeping table order. An empty selection means every case.
    pub fn select(&self, names: &[String]) -> Result<Vec<TestCase>, ConfigError> {
        if names.is_empty() {
            return Ok(self.cases.clone());
        }
        for name in names {
            if self.find_by_name(name).is_none() {
                return Err(ConfigError::UnknownCase {
                    name: name.clone(),
                    available: self.names().into_iter().map(str::to_string).collect(),
                });
            }
        }
        Ok(self
            .cases
            .iter()
            .filter(|c| names.iter().any(|n| n == &c.name))
            .cloned()
            .collect())
    }

    /// Case names as a JSON array (CI matrix input).
    pub fn names_json(&self) -> String {
        serde_json::to_string(&self.names()).unwrap_or_else(|_| "[]".to_string())
    }
}

fn parse_expect(value: Option<String>, context: impl FnOnce() -> String) -> Result<Option<ExpectedOutcome>, ConfigError> {
    value
        .map(|v| {
            v.parse::<ExpectedOutcome>().map_err(|source| ConfigError::InvalidExpectation {
                context: context(),
                source,
            })
        })
        .transpose()
}

fn resolve(raw: RawConfig) -> Result<ReportgenConfig, ConfigError> {
    if raw.engine.program.trim().is_empty() {
        return Err(ConfigError::EmptyProgram);
    }
    let engine = EngineConfig {
        program: raw.engine.program,
        args: raw.engine.args,
        output_flag: raw.engine.output_flag.unwrap_or_else(|| "-o".to_string()),
        timeout: raw.engine.timeout_secs.map(Duration::from_secs),
    };

    let defaults = HarnessSettings::default();
    let comparator = match raw.harness.comparator.as_deref() {
        None | Some("in-process") => ComparatorKind::InProcess,
        Some("diff-tool") => ComparatorKind::DiffTool {
            program: raw.harness.diff_program.unwrap_or_else(|| "diff".to_string()),
            args: raw.harness.diff_args.unwrap_or_else(|| vec!["-q".to_string()]),
        },
        Some(other) => return Err(ConfigError::UnknownComparator(other.to_string())),
    };
    if raw.harness.jobs == Some(0) {
        return Err(ConfigError::InvalidJobs);
    }
    let harness = HarnessSettings {
        output_dir: raw.harness.output_dir.unwrap_or(defaults.output_dir),
        suffix: raw.harness.suffix.unwrap_or(defaults.suffix),
        expect: parse_expect(raw.harness.expect, || "harness.expect".to_string())?.unwrap_or(defaults.expect),
        comparator,
        parallel: raw.harness.parallel,
        jobs: raw.harness.jobs,
    };

    if raw.cases.is_empty() {
        return Err(ConfigError::NoCases);
    }

    let mut cases = Vec::with_capacity(raw.cases.len());
    let mut outputs: HashMap<PathBuf, String> = HashMap::new();
    let mut references: HashMap<PathBuf, String> = HashMap::new();
    for (index, rc) in raw.cases.into_iter().enumerate() {
        if rc.name.trim().is_empty() {
            return Err(ConfigError::EmptyField { index, field: "name" });
        }
        if rc.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField { index, field: "root" });
        }
        if rc.reference.as_os_str().is_empty() {
            return Err(ConfigError::EmptyField { index, field: "reference" });
        }
        if rc.setup.as_ref().is_some_and(|argv| argv.is_empty()) {
            return Err(ConfigError::EmptyField { index, field: "setup" });
        }
        if cases.iter().any(|c: &TestCase| c.name == rc.name) {
            return Err(ConfigError::DuplicateName(rc.name));
        }

        let name = rc.name;
        let expect = parse_expect(rc.expect, || format!("case '{}' expect", name))?;
        let case = TestCase {
            name,
            description: rc.description,
            root: rc.root,
            reference: rc.reference,
            args: rc.args,
            env: rc.env,
            setup: rc.setup,
            expect,
        };

        let output = case.output_path(&harness.output_dir, &harness.suffix);
        if let Some(first) = outputs.insert(normalize_path(&output), case.name.clone()) {
            return Err(ConfigError::DuplicateOutput {
                first,
                second: case.name,
                path: output,
            });
        }
        if let Some(first) = references.insert(normalize_path(&case.reference), case.name.clone()) {
            return Err(ConfigError::DuplicateReference {
                first,
                second: case.name,
                path: case.reference,
            });
        }
        cases.push(case);
    }

    // A generated report must never land on a committed reference, its own or another case's.
    for case in &cases {
        let output = case.output_path(&harness.output_dir, &harness.suffix);
        if let Some(owner) = references.get(&normalize_path(&output)) {
            return Err(ConfigError::OutputIsReference {
                case: case.name.clone(),
                owner: owner.clone(),
                path: output,
            });
        }
    }

    Ok(ReportgenConfig { engine, harness, cases })
}
