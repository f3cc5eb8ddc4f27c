//! Golden runner integration tests
//!
//! A deterministic in-process engine stands in for the analysis binary: it counts `.sol` files and non-comment lines
//! and reports every `tx.origin` use. The committed references under `tests/fixtures/reports/` were produced by it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reportgen::harness::{
    CaseFailure, CaseOutcome, ConsoleReporter, GenerationError, GoldenRunner, InProcessComparator, ReportGenerator,
    RunOptions, RunReporter, RunSummary, SilentReporter, TestCase,
};
use reportgen_core::{CaseState, ContentMatch, ExpectedOutcome};
use tempfile::TempDir;

const MINIMAL_ROOT: &str = "tests/fixtures/minimal";
const VULNERABLE_ROOT: &str = "tests/fixtures/vulnerable";
const MINIMAL_REPORT: &str = "tests/fixtures/reports/minimal.md";
const VULNERABLE_REPORT: &str = "tests/fixtures/reports/vulnerable.md";

// ============================================================================
// Fake engine
// ============================================================================

#[derive(Default)]
struct FakeEngine {
    calls: AtomicUsize,
}

impl FakeEngine {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn collect_sources(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources(root, &path, out)?;
        } else if path.extension().is_some_and(|e| e == "sol") {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, fs::read_to_string(&path)?));
        }
    }
    Ok(())
}

fn render(root: &Path) -> std::io::Result<String> {
    let mut files = Vec::new();
    collect_sources(root, root, &mut files)?;
    files.sort();

    let mut nsloc = 0;
    let mut findings = Vec::new();
    for (rel, contents) in &files {
        for (i, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("//") {
                nsloc += 1;
            }
            if line.contains("tx.origin") {
                findings.push((rel.clone(), i + 1));
            }
        }
    }

    let mut out = String::from("# Aderyn Analysis Report\n\n| Key | Value |\n| --- | --- |\n");
    out.push_str(&format!("| .sol Files | {} |\n| Total nSLOC | {} |\n\n", files.len(), nsloc));
    out.push_str("## Issue Summary\n\n| Category | No. of Issues |\n| --- | --- |\n");
    out.push_str(&format!("| High | {} |\n", findings.len()));
    if !findings.is_empty() {
        out.push_str("\n## H-1: Use of `tx.origin` for authorization\n\n");
        for (rel, line) in findings {
            out.push_str(&format!("- Found in {} [Line: {}]\n", rel, line));
        }
    }
    Ok(out)
}

impl ReportGenerator for FakeEngine {
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !root.is_dir() {
            return Err(GenerationError::InvalidRoot {
                root: root.to_path_buf(),
                reason: "no such directory".to_string(),
            });
        }
        let report = render(root).map_err(|e| GenerationError::AnalysisFailure(e.to_string()))?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|source| GenerationError::WriteFailure {
                path: output.to_path_buf(),
                source,
            })?;
        }
        fs::write(output, report).map_err(|source| GenerationError::WriteFailure {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Records the order in which outcomes reach the reporter.
#[derive(Default)]
struct RecordingReporter {
    started: Option<usize>,
    seen: Vec<String>,
    completed: bool,
}

impl RunReporter for RecordingReporter {
    fn on_run_start(&mut self, case_count: usize) {
        self.started = Some(case_count);
    }

    fn on_case_complete(&mut self, outcome: &CaseOutcome) {
        self.seen.push(outcome.name.clone());
    }

    fn on_run_complete(&mut self, _summary: &RunSummary) {
        self.completed = true;
    }
}

fn runner_in<'a>(out: &TempDir, engine: &'a FakeEngine) -> GoldenRunner<&'a FakeEngine, InProcessComparator> {
    GoldenRunner::with_options(
        engine,
        InProcessComparator,
        RunOptions {
            output_dir: out.path().to_path_buf(),
            ..RunOptions::default()
        },
    )
}

// ============================================================================
// Verification
// ============================================================================

#[test]
fn identical_report_passes() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let case = TestCase::new("minimal", MINIMAL_ROOT, MINIMAL_REPORT);

    let outcome = runner.verify_case(&case);

    assert!(outcome.passed(), "{:?}", outcome.error);
    assert_eq!(outcome.state, CaseState::Passed);
    assert_eq!(outcome.observed, Some(ContentMatch::Identical));
    assert_eq!(outcome.output, out.path().join("tests/fixtures/minimal-workflow.md"));
    assert_eq!(fs::read(&outcome.output).unwrap(), fs::read(MINIMAL_REPORT).unwrap());
    assert_eq!(engine.calls(), 1);
}

#[test]
fn new_finding_fails_with_diff() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let case = TestCase::new("regressed", VULNERABLE_ROOT, MINIMAL_REPORT);

    let outcome = runner.verify_case(&case);

    assert!(!outcome.passed());
    assert_eq!(outcome.observed, Some(ContentMatch::Different));
    let error = outcome.error.as_ref().unwrap();
    assert_eq!(error.root, PathBuf::from(VULNERABLE_ROOT));
    assert!(matches!(
        error.failure,
        CaseFailure::PolicyViolation {
            expected: ExpectedOutcome::Identical,
            observed: ContentMatch::Different
        }
    ));
    let diff = outcome.difference.as_deref().unwrap();
    assert!(diff.contains("-   5 | | .sol Files | 1 |"), "{}", diff);
    assert!(diff.contains("+   5 | | .sol Files | 2 |"), "{}", diff);
    // The generated report is kept for inspection.
    assert!(outcome.output.is_file());
}

#[test]
fn missing_root_fails_without_output() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let case = TestCase::new("gone", "tests/fixtures/does-not-exist", MINIMAL_REPORT);

    let outcome = runner.verify_case(&case);

    assert!(!outcome.passed());
    assert_eq!(outcome.observed, None);
    let error = outcome.error.unwrap();
    assert_eq!(error.failure.kind(), "invalid-root");
    assert!(error.to_string().starts_with("tests/fixtures/does-not-exist: generation failed"));
    assert!(!outcome.output.exists());
}

#[test]
fn missing_reference_is_a_comparison_error() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let case = TestCase::new("unblessed", MINIMAL_ROOT, "tests/fixtures/reports/never-blessed.md");

    let outcome = runner.verify_case(&case);

    assert_eq!(outcome.state, CaseState::Failed);
    assert_eq!(outcome.error.unwrap().failure.kind(), "missing-reference");
}

#[test]
fn rerun_is_idempotent() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let cases = [
        TestCase::new("minimal", MINIMAL_ROOT, MINIMAL_REPORT),
        TestCase::new("vulnerable", VULNERABLE_ROOT, VULNERABLE_REPORT),
    ];

    let first = runner.verify(&cases, &mut SilentReporter);
    let first_bytes: Vec<Vec<u8>> = first.outcomes.iter().map(|o| fs::read(&o.output).unwrap()).collect();
    let second = runner.verify(&cases, &mut SilentReporter);
    let second_bytes: Vec<Vec<u8>> = second.outcomes.iter().map(|o| fs::read(&o.output).unwrap()).collect();

    assert!(first.all_passed() && second.all_passed());
    assert_eq!(first_bytes, second_bytes);
    assert_eq!(engine.calls(), 4);
}

#[test]
fn failing_case_does_not_stop_the_run() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let cases = [
        TestCase::new("gone", "tests/fixtures/nowhere", MINIMAL_REPORT),
        TestCase::new("regressed", VULNERABLE_ROOT, MINIMAL_REPORT),
        TestCase::new("vulnerable", VULNERABLE_ROOT, VULNERABLE_REPORT).with_description("tx.origin checks"),
    ];
    let mut reporter = RecordingReporter::default();

    let summary = runner.verify(&cases, &mut reporter);

    assert_eq!(reporter.started, Some(3));
    assert_eq!(reporter.seen, ["gone", "regressed", "vulnerable"]);
    assert!(reporter.completed);
    assert_eq!((summary.passed(), summary.failed()), (1, 2));
    let kinds: Vec<&str> = summary
        .failures()
        .map(|o| o.error.as_ref().unwrap().failure.kind())
        .collect();
    assert_eq!(kinds, ["invalid-root", "policy-violation"]);
}

#[test]
fn inverted_policy_passes_on_divergence() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = GoldenRunner::with_options(
        &engine,
        InProcessComparator,
        RunOptions {
            output_dir: out.path().to_path_buf(),
            expect: ExpectedOutcome::Different,
            ..RunOptions::default()
        },
    );
    let cases = [
        TestCase::new("diverges", VULNERABLE_ROOT, MINIMAL_REPORT),
        TestCase::new("matches", MINIMAL_ROOT, MINIMAL_REPORT),
        TestCase::new("pinned", VULNERABLE_ROOT, VULNERABLE_REPORT).with_expect(ExpectedOutcome::Identical),
    ];

    let summary = runner.verify(&cases, &mut SilentReporter);
    let passed: Vec<bool> = summary.outcomes.iter().map(|o| o.passed()).collect();

    assert_eq!(passed, [true, false, true]);
    let failure = summary.failures().next().unwrap().error.as_ref().unwrap();
    assert_eq!(
        failure.failure.to_string(),
        "expected the generated report to be different to the reference, but it was identical"
    );
}

#[test]
fn clean_option_removes_passing_outputs_only() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = GoldenRunner::with_options(
        &engine,
        InProcessComparator,
        RunOptions {
            output_dir: out.path().to_path_buf(),
            clean_passing: true,
            ..RunOptions::default()
        },
    );
    let cases = [
        TestCase::new("minimal", MINIMAL_ROOT, MINIMAL_REPORT),
        TestCase::new("regressed", VULNERABLE_ROOT, MINIMAL_REPORT),
    ];

    let summary = runner.verify(&cases, &mut SilentReporter);

    assert!(!summary.outcomes[0].output.exists());
    assert!(summary.outcomes[1].output.exists());
}

#[test]
fn parallel_run_reports_in_table_order() {
    let out = tempfile::tempdir().unwrap();
    let trees = tempfile::tempdir().unwrap();
    let clean = fs::read_to_string("tests/fixtures/minimal/src/Counter.sol").unwrap();
    let wallet = fs::read_to_string("tests/fixtures/vulnerable/src/Wallet.sol").unwrap();

    let mut cases = Vec::new();
    for i in 0..8 {
        let root = trees.path().join(format!("project-{}", i));
        fs::create_dir_all(root.join("src")).unwrap();
        if i % 2 == 0 {
            fs::write(root.join("src/Counter.sol"), &clean).unwrap();
        } else {
            fs::write(root.join("src/Wallet.sol"), &wallet).unwrap();
        }
        cases.push(TestCase::new(format!("project-{}", i), root, MINIMAL_REPORT));
    }

    let engine = FakeEngine::default();
    let runner = GoldenRunner::with_options(
        &engine,
        InProcessComparator,
        RunOptions {
            output_dir: out.path().to_path_buf(),
            parallel: true,
            jobs: Some(4),
            ..RunOptions::default()
        },
    );
    let mut reporter = RecordingReporter::default();
    let summary = runner.verify(&cases, &mut reporter);

    let expected_names: Vec<String> = (0..8).map(|i| format!("project-{}", i)).collect();
    assert_eq!(reporter.seen, expected_names);
    let passed: Vec<bool> = summary.outcomes.iter().map(|o| o.passed()).collect();
    assert_eq!(passed, [true, false, true, false, true, false, true, false]);
    assert_eq!(engine.calls(), 8);
}

#[test]
fn console_report_names_the_failing_root() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let cases = [TestCase::new("regressed", VULNERABLE_ROOT, MINIMAL_REPORT)];
    let mut reporter = ConsoleReporter::with_writer(Vec::new(), false);

    runner.verify(&cases, &mut reporter);
    let text = String::from_utf8(reporter.into_inner()).unwrap();

    assert!(text.contains("regressed FAILED [policy-violation]"));
    assert!(text.contains(&format!("    {}: expected the generated report", VULNERABLE_ROOT)));
}

// ============================================================================
// Bless
// ============================================================================

#[test]
fn bless_rewrites_references_then_verify_passes() {
    let out = tempfile::tempdir().unwrap();
    let refs = tempfile::tempdir().unwrap();
    let reference = refs.path().join("vulnerable.md");
    fs::write(&reference, "stale\n").unwrap();

    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let cases = [TestCase::new("vulnerable", VULNERABLE_ROOT, &reference)];

    assert!(!runner.verify(&cases, &mut SilentReporter).all_passed());

    let blessed = runner.bless(&cases);
    assert!(blessed[0].error.is_none());
    assert_eq!(fs::read(&reference).unwrap(), fs::read(VULNERABLE_REPORT).unwrap());
    assert!(runner.verify(&cases, &mut SilentReporter).all_passed());
}

#[test]
fn bless_reports_generation_failures() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let cases = [TestCase::new("gone", "tests/fixtures/nowhere", out.path().join("gone.md"))];

    let blessed = runner.bless(&cases);

    assert_eq!(blessed[0].error.as_ref().unwrap().failure.kind(), "invalid-root");
    assert!(!out.path().join("gone.md").exists());
}

// ============================================================================
// Comparator substitution
// ============================================================================

/// Comparator that always reports a fixed result and remembers what it was asked.
struct ScriptedComparator {
    result: ContentMatch,
    asked: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl reportgen::harness::Comparator for ScriptedComparator {
    fn compare(
        &self,
        generated: &Path,
        reference: &Path,
    ) -> Result<ContentMatch, reportgen::harness::ComparisonError> {
        self.asked
            .lock()
            .unwrap()
            .push((generated.to_path_buf(), reference.to_path_buf()));
        Ok(self.result)
    }

    fn describe_difference(&self, _generated: &Path, _reference: &Path) -> Option<String> {
        Some("scripted".to_string())
    }
}

#[test]
fn comparator_receives_generated_then_reference() {
    let out = tempfile::tempdir().unwrap();
    let engine = FakeEngine::default();
    let comparator = ScriptedComparator {
        result: ContentMatch::Different,
        asked: Mutex::new(Vec::new()),
    };
    let runner = GoldenRunner::with_options(
        &engine,
        &comparator,
        RunOptions {
            output_dir: out.path().to_path_buf(),
            ..RunOptions::default()
        },
    );

    let outcome = runner.verify_case(&TestCase::new("minimal", MINIMAL_ROOT, MINIMAL_REPORT));

    assert_eq!(outcome.difference.as_deref(), Some("scripted"));
    let asked = comparator.asked.lock().unwrap();
    assert_eq!(
        *asked,
        [(out.path().join("tests/fixtures/minimal-workflow.md"), PathBuf::from(MINIMAL_REPORT))]
    );
}

// ============================================================================
// Isolation
// ============================================================================

/// Engine that panics for one root and delegates to the fake engine otherwise.
struct PanicsOn {
    root: &'static str,
    inner: FakeEngine,
}

impl ReportGenerator for PanicsOn {
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError> {
        if root == Path::new(self.root) {
            panic!("analyzer crashed on {}", root.display());
        }
        self.inner.generate(root, output)
    }
}

#[test]
fn panicking_case_is_recorded_and_the_run_continues() {
    let cases = [
        TestCase::new("vulnerable", VULNERABLE_ROOT, VULNERABLE_REPORT),
        TestCase::new("minimal", MINIMAL_ROOT, MINIMAL_REPORT),
    ];

    for parallel in [false, true] {
        let out = tempfile::tempdir().unwrap();
        let engine = PanicsOn {
            root: VULNERABLE_ROOT,
            inner: FakeEngine::default(),
        };
        let runner = GoldenRunner::with_options(
            engine,
            InProcessComparator,
            RunOptions {
                output_dir: out.path().to_path_buf(),
                parallel,
                ..RunOptions::default()
            },
        );

        let summary = runner.verify(&cases, &mut SilentReporter);

        assert_eq!(summary.outcomes[0].state, CaseState::Failed);
        let failure = &summary.outcomes[0].error.as_ref().unwrap().failure;
        assert_eq!(failure.kind(), "panicked");
        assert!(failure.to_string().contains("analyzer crashed on tests/fixtures/vulnerable"), "{}", failure);
        assert!(summary.outcomes[1].passed(), "parallel={}", parallel);

        let blessed = runner.bless(&cases[..1]);
        assert_eq!(blessed[0].error.as_ref().unwrap().failure.kind(), "panicked");
    }
}

#[test]
fn output_landing_on_the_reference_never_overwrites_it() {
    let out = tempfile::tempdir().unwrap();
    let reference = out.path().join("tests/fixtures/minimal-workflow.md");
    fs::create_dir_all(reference.parent().unwrap()).unwrap();
    fs::write(&reference, "committed golden\n").unwrap();

    let engine = FakeEngine::default();
    let runner = runner_in(&out, &engine);
    let outcome = runner.verify_case(&TestCase::new("self", MINIMAL_ROOT, &reference));

    assert!(!outcome.passed());
    assert_eq!(outcome.error.unwrap().failure.kind(), "output-is-reference");
    assert_eq!(fs::read_to_string(&reference).unwrap(), "committed golden\n");
    assert_eq!(engine.calls(), 0);
}
