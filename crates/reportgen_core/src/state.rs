//! Per-case lifecycle.
//!
//! ```text
//! Pending -> Generating -> Comparing -> Passed
//!                 |             |
//!                 +-------------+------> Failed
//! ```
//!
//! States only move forward and every case ends in exactly one terminal state.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseState {
    Pending,
    Generating,
    Comparing,
    Passed,
    Failed,
}

impl CaseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseState::Passed | CaseState::Failed)
    }

    /// Check whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: CaseState) -> bool {
        matches!(
            (self, next),
            (CaseState::Pending, CaseState::Generating)
                | (CaseState::Generating, CaseState::Comparing)
                | (CaseState::Generating, CaseState::Failed)
                | (CaseState::Comparing, CaseState::Passed)
                | (CaseState::Comparing, CaseState::Failed)
        )
    }

    /// Move to `next`, rejecting backwards or skipping transitions.
    pub fn advance(self, next: CaseState) -> Result<CaseState, InvalidTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaseState::Pending => "pending",
            CaseState::Generating => "generating",
            CaseState::Comparing => "comparing",
            CaseState::Passed => "passed",
            CaseState::Failed => "failed",
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: CaseState,
    pub to: CaseState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid case state transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}
