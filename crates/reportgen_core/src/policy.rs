//! Map comparison outcomes to verdicts.
//!
//! The conventional golden-test contract passes when the generated report is identical to its reference. Some
//! harness setups instead assert that a report *diverges* (for example, a fixture that is expected to gain findings
//! relative to a baseline). Both polarities are explicit [`ExpectedOutcome`] values; nothing is inferred.

use std::fmt;
use std::str::FromStr;

use crate::compare::ContentMatch;

/// What a case expects the comparison to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExpectedOutcome {
    /// Pass when the generated report equals the reference.
    #[default]
    Identical,
    /// Pass when the generated report differs from the reference.
    Different,
}

impl ExpectedOutcome {
    /// Decide the verdict for an observed comparison.
    ///
    /// ## Notes
    /// - The mapping is total and symmetric: exactly one of the two policies passes any given observation.
    pub fn verdict(self, observed: ContentMatch) -> Verdict {
        let passed = match self {
            ExpectedOutcome::Identical => observed == ContentMatch::Identical,
            ExpectedOutcome::Different => observed == ContentMatch::Different,
        };
        if passed { Verdict::Pass } else { Verdict::Fail }
    }

    /// The content relationship this policy expects to observe.
    pub fn expected_match(self) -> ContentMatch {
        match self {
            ExpectedOutcome::Identical => ContentMatch::Identical,
            ExpectedOutcome::Different => ContentMatch::Different,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExpectedOutcome::Identical => "identical",
            ExpectedOutcome::Different => "different",
        }
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an expected-outcome string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseExpectedOutcomeError(pub String);

impl fmt::Display for ParseExpectedOutcomeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown expected outcome '{}' (expected 'identical' or 'different')", self.0)
    }
}

impl std::error::Error for ParseExpectedOutcomeError {}

impl FromStr for ExpectedOutcome {
    type Err = ParseExpectedOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identical" => Ok(ExpectedOutcome::Identical),
            "different" => Ok(ExpectedOutcome::Different),
            _ => Err(ParseExpectedOutcomeError(s.to_string())),
        }
    }
}

/// Pass/fail outcome for a single case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASSED"),
            Verdict::Fail => write!(f, "FAILED"),
        }
    }
}
