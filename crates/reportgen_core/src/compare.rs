//! Classify report comparisons.
//!
//! Two sources of truth feed the same classification:
//! - in-process byte comparison ([`compare_bytes`]), and
//! - an external diff tool, whose exit status follows the POSIX `diff`/`cmp` contract ([`DiffStatus`]):
//!   `0` = identical, `1` = differences found, anything else = trouble.
//!
//! A tool failure is never a content mismatch. Callers must keep [`DiffStatus::Trouble`] distinct from
//! [`DiffStatus::Different`].

use std::fmt;

/// Content relationship between a generated report and its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentMatch {
    Identical,
    Different,
}

impl ContentMatch {
    pub fn is_identical(self) -> bool {
        matches!(self, ContentMatch::Identical)
    }
}

impl fmt::Display for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentMatch::Identical => write!(f, "identical"),
            ContentMatch::Different => write!(f, "different"),
        }
    }
}

/// Compare two report bodies byte-for-byte.
pub fn compare_bytes(expected: &[u8], actual: &[u8]) -> ContentMatch {
    if expected == actual {
        ContentMatch::Identical
    } else {
        ContentMatch::Different
    }
}

/// Interpretation of a diff tool's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    /// Exit status `0`.
    Identical,
    /// Exit status `1`.
    Different,
    /// Any other status. `None` means the tool produced no status at all (killed by a signal).
    Trouble(Option<i32>),
}

impl DiffStatus {
    /// Interpret a raw exit code.
    ///
    /// ## Parameters
    /// - `code`: the process exit code, or `None` when the process was terminated by a signal.
    ///
    /// ## Returns
    /// - (`DiffStatus`): `0` → `Identical`, `1` → `Different`, anything else → `Trouble`.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => DiffStatus::Identical,
            Some(1) => DiffStatus::Different,
            other => DiffStatus::Trouble(other),
        }
    }

    /// The exit code this status corresponds to. Signal terminations map to `2`, like `diff` trouble.
    pub fn code(self) -> i32 {
        match self {
            DiffStatus::Identical => 0,
            DiffStatus::Different => 1,
            DiffStatus::Trouble(code) => code.unwrap_or(2),
        }
    }

    /// Content classification, or `None` if the tool was in trouble.
    pub fn content_match(self) -> Option<ContentMatch> {
        match self {
            DiffStatus::Identical => Some(ContentMatch::Identical),
            DiffStatus::Different => Some(ContentMatch::Different),
            DiffStatus::Trouble(_) => None,
        }
    }
}

impl From<ContentMatch> for DiffStatus {
    fn from(m: ContentMatch) -> Self {
        match m {
            ContentMatch::Identical => DiffStatus::Identical,
            ContentMatch::Different => DiffStatus::Different,
        }
    }
}

/// The first line at which two reports diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDifference {
    /// 1-based line number.
    pub line: usize,
    /// Reference line, `None` past the end of the reference.
    pub expected: Option<String>,
    /// Generated line, `None` past the end of the generated report.
    pub actual: Option<String>,
    /// Total number of line positions that differ.
    pub differing_lines: usize,
}

impl fmt::Display for LineDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "first difference at line {} ({} differing line(s))",
            self.line, self.differing_lines
        )
    }
}

/// Locate the first differing line between two reports.
///
/// Lines are compared position by position. Differences that only show up in line endings or a trailing newline are
/// reported at the line count boundary with both sides `None`.
///
/// ## Returns
/// - (`Option<LineDifference>`): `None` when the texts are identical.
pub fn first_line_difference(expected: &str, actual: &str) -> Option<LineDifference> {
    if expected == actual {
        return None;
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let max_lines = expected_lines.len().max(actual_lines.len());

    let mut first: Option<(usize, Option<&str>, Option<&str>)> = None;
    let mut differing = 0;
    for i in 0..max_lines {
        let exp = expected_lines.get(i).copied();
        let act = actual_lines.get(i).copied();
        if exp != act {
            differing += 1;
            if first.is_none() {
                first = Some((i + 1, exp, act));
            }
        }
    }

    match first {
        Some((line, exp, act)) => Some(LineDifference {
            line,
            expected: exp.map(str::to_string),
            actual: act.map(str::to_string),
            differing_lines: differing,
        }),
        // Same lines, different bytes: line terminators or the trailing newline.
        None => Some(LineDifference {
            line: max_lines + 1,
            expected: None,
            actual: None,
            differing_lines: 1,
        }),
    }
}

/// Render a compact line diff, at most `max_lines` entries, in `-NNNN | text` / `+NNNN | text` form.
pub fn render_line_diff(expected: &str, actual: &str, max_lines: usize) -> String {
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let total = expected_lines.len().max(actual_lines.len());

    let mut diff = String::new();
    let mut shown = 0;
    let mut omitted = 0;
    for i in 0..total {
        let exp = expected_lines.get(i);
        let act = actual_lines.get(i);
        if exp == act {
            continue;
        }
        if shown >= max_lines {
            omitted += 1;
            continue;
        }
        if let Some(line) = exp {
            diff.push_str(&format!("-{:4} | {}\n", i + 1, line));
        }
        if let Some(line) = act {
            diff.push_str(&format!("+{:4} | {}\n", i + 1, line));
        }
        shown += 1;
    }
    if omitted > 0 {
        diff.push_str(&format!("... {} more differing line(s)\n", omitted));
    }
    diff
}
