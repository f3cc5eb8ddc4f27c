#![forbid(unsafe_code)]
//! Golden-file regression harness for the smart-contract report generator.
//!
//! The harness runs the analysis engine over a fixed table of sample contract trees, writes each fresh report next to
//! its tree and compares it with a committed reference report. Any drift in the generator's output shows up as a
//! failing case.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Case failures**: A failing case is data, not a panic. It is recorded in its `CaseOutcome` and the run continues.

pub mod cli;
pub mod config;
pub mod harness;
pub mod version;

pub use config::{ConfigError, ReportgenConfig};
pub use harness::{GoldenRunner, ReportGenerator, RunSummary, TestCase};
