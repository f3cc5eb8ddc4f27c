//! Subprocess report generator.
//!
//! Runs the external analysis engine as
//!
//! ```text
//! <program> <engine args...> <root> <case args...> -o <temporary output>
//! ```
//!
//! The engine writes into a uniquely named temporary file next to the final output path. Only after the engine exits
//! successfully is that file renamed over the output, so a failed or killed run never leaves a partial report behind.
//! The temporary file keeps the output's extension because the engine picks its renderer (markdown, JSON, SARIF)
//! from it.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::case::TestCase;
use super::interfaces::{GenerationError, ReportGenerator};
use crate::config::EngineConfig;

/// How often a time-limited engine run is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Number of trailing stderr lines kept in an analysis failure.
const STDERR_TAIL_LINES: usize = 20;

/// Report generator backed by an external engine binary.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    output_flag: String,
    timeout: Option<Duration>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output_flag: "-o".to_string(),
            timeout: None,
        }
    }

    pub fn from_config(engine: &EngineConfig) -> Self {
        Self {
            program: engine.program.clone(),
            args: engine.args.clone(),
            output_flag: engine.output_flag.clone(),
            timeout: engine.timeout,
        }
    }

    /// Arguments placed before the root on every invocation.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    #[tracing::instrument(skip_all, fields(program = %self.program, root = %root.display()))]
    fn run_engine(
        &self,
        root: &Path,
        output: &Path,
        case_args: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<(), GenerationError> {
        check_root(root)?;
        let parent = prepare_output_dir(output)?;

        let suffix = output
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staging = tempfile::Builder::new()
            .prefix(".reportgen-")
            .suffix(&suffix)
            .tempfile_in(&parent)
            .map_err(|source| GenerationError::WriteFailure {
                path: output.to_path_buf(),
                source,
            })?
            .into_temp_path();

        let mut stderr_sink = tempfile::tempfile().map_err(|source| GenerationError::WriteFailure {
            path: output.to_path_buf(),
            source,
        })?;
        let stderr_handle = stderr_sink
            .try_clone()
            .map_err(|e| GenerationError::AnalysisFailure(format!("cannot capture engine stderr: {}", e)))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(root)
            .args(case_args)
            .arg(&self.output_flag)
            .arg(&*staging)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_handle));
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            // Lead a process group so a timeout also reaches processes the engine spawns.
            command.process_group(0);
        }

        tracing::debug!(staging = %staging.display(), "starting analysis engine");
        let mut child = command
            .spawn()
            .map_err(|e| GenerationError::AnalysisFailure(format!("failed to start '{}': {}", self.program, e)))?;

        let status = wait_for(&mut child, self.timeout)?;
        if !status.success() {
            let stderr = read_tail(&mut stderr_sink, STDERR_TAIL_LINES);
            return Err(GenerationError::AnalysisFailure(format!(
                "'{}' exited with {}{}",
                self.program,
                status,
                if stderr.is_empty() { String::new() } else { format!("\n{}", stderr) }
            )));
        }

        // The staging file exists from the start; an engine that never wrote to it leaves it empty.
        if fs::metadata(&*staging).map(|m| m.len() == 0).unwrap_or(true) {
            return Err(GenerationError::AnalysisFailure(format!(
                "'{}' exited successfully but wrote no report",
                self.program
            )));
        }

        staging.persist(output).map_err(|e| GenerationError::WriteFailure {
            path: output.to_path_buf(),
            source: e.error,
        })?;
        tracing::debug!(output = %output.display(), "report written");
        Ok(())
    }

    fn run_setup(&self, case: &TestCase, argv: &[String]) -> Result<(), GenerationError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(GenerationError::Setup(format!("case '{}' has an empty setup command", case.name)));
        };

        tracing::info!(case = %case.name, command = %argv.join(" "), "running setup");
        let status = Command::new(program)
            .args(args)
            .envs(&case.env)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| GenerationError::Setup(format!("failed to start '{}': {}", program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(GenerationError::Setup(format!("'{}' exited with {}", argv.join(" "), status)))
        }
    }
}

impl ReportGenerator for CommandGenerator {
    fn generate(&self, root: &Path, output: &Path) -> Result<(), GenerationError> {
        self.run_engine(root, output, &[], &BTreeMap::new())
    }

    fn generate_case(&self, case: &TestCase, output: &Path) -> Result<(), GenerationError> {
        // Root is checked before setup so a missing root never runs arbitrary setup commands.
        check_root(&case.root)?;
        if let Some(argv) = &case.setup {
            self.run_setup(case, argv)?;
        }
        self.run_engine(&case.root, output, &case.args, &case.env)
    }
}

/// Reject roots that do not exist. Anything that exists (directory or single source file) is handed to the engine,
/// which owns layout detection.
pub fn check_root(root: &Path) -> Result<(), GenerationError> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() || meta.is_file() => Ok(()),
        Ok(_) => Err(GenerationError::InvalidRoot {
            root: root.to_path_buf(),
            reason: "not a directory or source file".to_string(),
        }),
        Err(e) => Err(GenerationError::InvalidRoot {
            root: root.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Ensure the output's parent directory exists and return it.
fn prepare_output_dir(output: &Path) -> Result<PathBuf, GenerationError> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|source| GenerationError::WriteFailure {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(parent)
}

fn wait_for(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, GenerationError> {
    let Some(limit) = timeout else {
        return child
            .wait()
            .map_err(|e| GenerationError::AnalysisFailure(format!("failed waiting for engine: {}", e)));
    };

    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                tracing::warn!(limit_secs = limit.as_secs_f64(), "engine exceeded its time limit; killing it");
                kill_process_group(child);
                return Err(GenerationError::Timeout { limit });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                return Err(GenerationError::AnalysisFailure(format!("failed polling engine: {}", e)));
            }
        }
    }
}

/// Kill a time-limited engine and everything it spawned, then reap it.
///
/// Time-limited engines lead their own process group (pgid = pid), so signalling `-pid` reaches descendants.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let status = Command::new("kill")
            .args(["-s", "KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !status.is_ok_and(|s| s.success()) {
            tracing::debug!(pgid = child.id(), "could not signal the engine's process group");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn read_tail(file: &mut File, max_lines: usize) -> String {
    let mut buf = Vec::new();
    if file.seek(SeekFrom::Start(0)).is_err() || file.read_to_end(&mut buf).is_err() {
        return String::new();
    }
    let text = String::from_utf8_lossy(&buf);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
