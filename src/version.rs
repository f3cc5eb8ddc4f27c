//! Harness version information.
//!
//! This module exposes the version as a single constant so the CLI and JSON summaries agree on the same value.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! - Prefer this constant over repeating `env!("CARGO_PKG_VERSION")` in multiple places.

/// The reportgen version string (for example, `0.1.0`).
pub const REPORTGEN_VERSION: &str = env!("CARGO_PKG_VERSION");
