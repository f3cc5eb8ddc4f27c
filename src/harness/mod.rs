//! Golden-file regression harness
//!
//! ## Modules
//!
//! - `case` - Test case table entries
//! - `interfaces` - Generator and comparator boundaries
//! - `engine` - Subprocess generator driving the analysis engine
//! - `compare` - In-process and diff-tool comparators
//! - `runner` - Per-case state machine and run orchestration
//! - `reporter` - Console and JSON reporting

pub mod case;
pub mod compare;
pub mod engine;
pub mod interfaces;
pub mod reporter;
pub mod runner;

pub use case::TestCase;
pub use compare::{DiffToolComparator, InProcessComparator};
pub use engine::CommandGenerator;
pub use interfaces::{Comparator, ComparisonError, GenerationError, MAX_DIFF_LINES, ReportGenerator};
pub use reporter::{ConsoleReporter, JsonReporter, RunReporter, SilentReporter};
pub use runner::{BlessOutcome, CaseError, CaseFailure, CaseOutcome, GoldenRunner, RunOptions, RunSummary};
