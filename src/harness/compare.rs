//! Comparators: in-process byte comparison and the external diff-tool boundary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reportgen_core::{ContentMatch, DiffStatus, compare_bytes};

use super::interfaces::{Comparator, ComparisonError};

/// Byte-for-byte comparison without spawning a process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessComparator;

impl Comparator for InProcessComparator {
    fn compare(&self, generated: &Path, reference: &Path) -> Result<ContentMatch, ComparisonError> {
        let expected = read_report(reference, ComparisonError::MissingReference)?;
        let actual = read_report(generated, ComparisonError::MissingGenerated)?;
        Ok(compare_bytes(&expected, &actual))
    }
}

/// Comparison through an external `diff`-compatible tool.
///
/// The tool is run as `<program> <args...> <reference> <generated>`; its exit status is interpreted as 0 = identical,
/// 1 = different, anything else = tool error.
#[derive(Debug, Clone)]
pub struct DiffToolComparator {
    program: String,
    args: Vec<String>,
}

impl DiffToolComparator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-q".to_string()],
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for DiffToolComparator {
    fn default() -> Self {
        Self::new("diff")
    }
}

impl Comparator for DiffToolComparator {
    fn compare(&self, generated: &Path, reference: &Path) -> Result<ContentMatch, ComparisonError> {
        // Missing files are classified here; a diff tool would report them as generic trouble.
        if !reference.is_file() {
            return Err(ComparisonError::MissingReference(reference.to_path_buf()));
        }
        if !generated.is_file() {
            return Err(ComparisonError::MissingGenerated(generated.to_path_buf()));
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(reference)
            .arg(generated)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ComparisonError::ToolError(format!("failed to start '{}': {}", self.program, e)))?;

        let status = DiffStatus::from_exit_code(output.status.code());
        tracing::debug!(program = %self.program, code = status.code(), "diff tool finished");
        status.content_match().ok_or_else(|| {
            ComparisonError::ToolError(format!(
                "'{}' exited with status {}: {}",
                self.program,
                status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        })
    }
}

fn read_report(path: &Path, missing: fn(PathBuf) -> ComparisonError) -> Result<Vec<u8>, ComparisonError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => missing(path.to_path_buf()),
        _ => ComparisonError::ToolError(format!("cannot read '{}': {}", path.display(), e)),
    })
}
