//! Provide the pure, shared vocabulary of the reportgen golden-report harness.
//!
//! Everything in this crate is deterministic and side-effect free. The harness crate owns all filesystem and process
//! work; this crate only answers questions such as "where does the generated report for this root go?", "what does a
//! diff exit status mean?" and "does this comparison pass under the configured policy?".
//!
//! ## Notes
//!
//! - This is a "semantic core" crate: **no IO**, no global state, no dependencies.
//! - Current scope: output-path derivation, content comparison classification (including the external diff-tool
//!   status contract), expected-outcome policy and verdicts, the per-case state machine, and line-level difference
//!   summaries used in failure reports.

pub mod compare;
pub mod paths;
pub mod policy;
pub mod state;

pub use compare::{ContentMatch, DiffStatus, LineDifference, compare_bytes, first_line_difference, render_line_diff};
pub use paths::{WORKFLOW_SUFFIX, derive_output_path, normalize_path};
pub use policy::{ExpectedOutcome, ParseExpectedOutcomeError, Verdict};
pub use state::{CaseState, InvalidTransition};
