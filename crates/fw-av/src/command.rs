//! Builder for executing external tool commands with timeout, cancellation
//! and niceness support.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use fw_core::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use fw_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> fw_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_streams")
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    niceness: Option<i32>,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            niceness: None,
            cancel: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run the process at reduced scheduling priority (via `nice` where
    /// available; ignored elsewhere).
    pub fn niceness(&mut self, n: i32) -> &mut Self {
        if n != 0 {
            self.niceness = Some(n);
        }
        self
    }

    /// Attach a cancellation token; cancelling it kills the process.
    pub fn cancel_token(&mut self, token: CancellationToken) -> &mut Self {
        self.cancel = Some(token);
        self
    }

    /// Resolve the effective program and argument list, wrapping with
    /// `nice -n <level>` when a niceness was requested.
    fn effective_invocation(&self) -> (PathBuf, Vec<String>) {
        if let Some(level) = self.niceness {
            if cfg!(unix) {
                if let Ok(nice) = which::which("nice") {
                    let mut args = vec![
                        "-n".to_string(),
                        level.to_string(),
                        self.program.to_string_lossy().into_owned(),
                    ];
                    args.extend(self.args.iter().cloned());
                    return (nice, args);
                }
            }
        }
        (self.program.clone(), self.args.clone())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if the attached token fires; the child is
    ///   killed.
    /// - [`Error::Tool`] on timeout, spawn failure, or a non-zero exit
    ///   status (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let tool_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        let (program, args) = self.effective_invocation();

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        // Make sure abandoned children (timeout, cancellation) are killed
        // when their future is dropped.
        cmd.kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| Error::Tool {
            tool: tool_name.clone(),
            message: format!("failed to spawn: {e}"),
        })?;

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            res = tokio::time::timeout(self.timeout, child.wait_with_output()) => res,
            _ = cancelled => {
                tracing::debug!(tool = %tool_name, "tool execution cancelled");
                return Err(Error::Cancelled);
            }
        };

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::Tool {
                        tool: tool_name,
                        message: format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    });
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::Tool {
                tool: tool_name,
                message: format!("I/O error waiting for process: {e}"),
            }),
            Err(_elapsed) => Err(Error::Tool {
                tool: tool_name,
                message: format!("timed out after {:?}", self.timeout),
            }),
        }
    }
}
