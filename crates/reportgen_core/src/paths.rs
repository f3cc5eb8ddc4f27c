//! Derive the output path a generated report is written to.
//!
//! The harness never writes over a committed reference. Each case instead gets a sibling artifact whose name is a pure
//! function of the case root: leading `.`/`..` segments are stripped, the workflow suffix is appended to the last
//! segment and the reference's extension is reused so the engine renders the same format.
//!
//! ```rust
//! use std::path::{Path, PathBuf};
//! use reportgen_core::{WORKFLOW_SUFFIX, derive_output_path};
//!
//! let out = derive_output_path(Path::new("../tests/contract-playground/"), Path::new("reports/report.md"), WORKFLOW_SUFFIX);
//! assert_eq!(out, PathBuf::from("tests/contract-playground-workflow.md"));
//! ```

use std::path::{Component, Path, PathBuf};

/// Default suffix appended to the root's final segment.
pub const WORKFLOW_SUFFIX: &str = "-workflow";

/// Stem used when the root has no named segment at all (e.g. `.` or `../..`) and the reference has no stem either.
const FALLBACK_STEM: &str = "report";

/// Derive the relative output path for a case.
///
/// ## Parameters
/// - `root`: the case's project root as written in the case table.
/// - `reference`: the committed reference report; only its extension (and stem, as a fallback) is used.
/// - `suffix`: appended to the final root segment, before the extension.
///
/// ## Returns
/// - (`PathBuf`): a relative path; never absolute and never containing `..`.
///
/// ## Notes
/// - Leading `.`/`..` segments, root and prefix components are dropped.
/// - A `..` after a named segment pops that segment (lexical normalization), so the result cannot escape the
///   directory it is later joined onto.
/// - If nothing named remains, the reference's stem is used as the final segment.
pub fn derive_output_path(root: &Path, reference: &Path, suffix: &str) -> PathBuf {
    let mut segments: Vec<&std::ffi::OsStr> = Vec::new();
    for component in root.components() {
        match component {
            Component::Normal(name) => segments.push(name),
            Component::ParentDir => {
                segments.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let last = match segments.pop() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => reference
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_STEM.to_string()),
    };

    let file_name = match reference.extension() {
        Some(ext) => format!("{}{}.{}", last, suffix, ext.to_string_lossy()),
        None => format!("{}{}", last, suffix),
    };

    let mut out: PathBuf = segments.iter().collect();
    out.push(file_name);
    out
}

/// Lexically normalize a path so two spellings of the same file compare equal.
///
/// ## Notes
/// - `.` components are dropped and a `..` cancels the named segment before it.
/// - Leading `..`, root and prefix components are kept; symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(parts.last(), Some(Component::Normal(_))) => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
