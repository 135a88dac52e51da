//! External encoder invocation.
//!
//! A run succeeds only when the process exits with code 0 and the expected output
//! path exists afterwards.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Keep the tail of stderr; encoders print the actual failure last.
const MAX_STDERR_CHARS: usize = 4000;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl Display for ToolCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub status_code: Option<i32>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not produce {}", .path.display())]
    MissingOutput { program: String, path: PathBuf },
}

/// Runs external commands. Swapped for a fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, ToolError> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        Ok(ToolOutput {
            status_code: output.status.code(),
            stderr: tail(&String::from_utf8_lossy(&output.stderr), MAX_STDERR_CHARS),
        })
    }
}

fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

#[tracing::instrument(skip(runner, command), fields(program = %command.program))]
pub async fn run_external_tool(
    runner: &dyn CommandRunner,
    command: &ToolCommand,
    expected_output: &Path,
) -> Result<(), ToolError> {
    let start = std::time::Instant::now();
    let output = runner.run(command).await?;

    if !output.success() {
        tracing::warn!(
            command = %command,
            status = ?output.status_code,
            stderr = %output.stderr,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "External tool failed"
        );
        return Err(ToolError::NonZeroExit {
            program: command.program.clone(),
            code: output.status_code,
            stderr: output.stderr,
        });
    }

    if !tokio::fs::try_exists(expected_output).await.unwrap_or(false) {
        tracing::warn!(
            command = %command,
            expected_output = %expected_output.display(),
            "External tool exited successfully without producing its output"
        );
        return Err(ToolError::MissingOutput {
            program: command.program.clone(),
            path: expected_output.to_path_buf(),
        });
    }

    tracing::debug!(
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "External tool finished"
    );
    Ok(())
}
