//! Process runner
//!
//! Launches the renderer once per request, waits for it, and classifies
//! the result. Classification is conservative:
//! - launch failure → failure
//! - any byte on stderr → failure, even with exit code 0
//! - non-zero exit → failure
//!
//! The output file is not inspected here. No retries.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BuildError;
use crate::invocation::{Invocation, RenderJob};

/// Result of executing a render job
#[derive(Debug)]
pub enum RenderOutcome {
    /// Renderer reported success; the artifact should be at this path
    Success(PathBuf),
    /// Renderer could not be launched or reported an error
    Failure(BuildError),
}

impl RenderOutcome {
    /// True for `Success`
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Fully resolved OS-level command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Executable actually spawned (interpreter or renderer)
    pub program: PathBuf,
    /// Arguments after the executable
    pub args: Vec<OsString>,
    /// Working directory of the child
    pub current_dir: PathBuf,
}

/// Everything a finished child process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit status was success
    pub success: bool,
    /// Human-readable exit status
    pub status: String,
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
}

/// Seam for spawning child processes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Run `command` to completion, capturing stdout and stderr.
    ///
    /// Dropping the returned future must kill the child.
    async fn launch(&self, command: &LaunchCommand) -> std::io::Result<CapturedOutput>;
}

/// Launcher backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, command: &LaunchCommand) -> std::io::Result<CapturedOutput> {
        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.current_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CapturedOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Runs renderer invocations
#[derive(Clone)]
pub struct ProcessRunner {
    launcher: Arc<dyn Launcher>,
    interpreter: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("interpreter", &self.interpreter)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProcessRunner {
    /// Runner spawning real processes
    #[must_use]
    pub fn new() -> Self {
        Self::with_launcher(Arc::new(SystemLauncher))
    }

    /// Runner with a custom launcher
    #[must_use]
    pub fn with_launcher(launcher: Arc<dyn Launcher>) -> Self {
        Self {
            launcher,
            interpreter: None,
            timeout: None,
        }
    }

    /// Launch renderers through `interpreter` (e.g. `python`)
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: Option<PathBuf>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Kill renderers that run longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// OS command for an invocation, working directory = renderer's directory
    #[must_use]
    pub fn command_for(&self, invocation: &Invocation) -> LaunchCommand {
        let current_dir = invocation
            .program
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let args = invocation.args.iter().map(OsString::from);

        match &self.interpreter {
            Some(interpreter) => LaunchCommand {
                program: interpreter.clone(),
                args: std::iter::once(invocation.program.clone().into_os_string())
                    .chain(args)
                    .collect(),
                current_dir,
            },
            None => LaunchCommand {
                program: invocation.program.clone(),
                args: args.collect(),
                current_dir,
            },
        }
    }

    /// Configured bounded wait, if any
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Execute a render job and classify the result
    pub async fn run(&self, job: &RenderJob) -> RenderOutcome {
        match self.capture(&job.invocation).await {
            Ok(_) => RenderOutcome::Success(job.output_path.clone()),
            Err(e) => RenderOutcome::Failure(e),
        }
    }

    /// Execute an invocation and return its stdout when classified a success
    ///
    /// # Errors
    /// `RendererLaunchFailure`, `RendererReportedError` or `RendererTimedOut`
    pub async fn capture(&self, invocation: &Invocation) -> Result<String, BuildError> {
        let command = self.command_for(invocation);
        tracing::debug!(
            program = %command.program.display(),
            args = ?command.args,
            "Launching renderer"
        );

        let launched = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.launcher.launch(&command))
                .await
                .map_err(|_| BuildError::RendererTimedOut { secs: limit.as_secs() })?,
            None => self.launcher.launch(&command).await,
        };

        let output = launched.map_err(|source| BuildError::RendererLaunchFailure {
            program: command.program.clone(),
            source,
        })?;

        classify(&output)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the failure policy to a finished process
///
/// # Errors
/// `RendererReportedError` with stderr text, falling back to stdout text,
/// falling back to the exit status.
pub fn classify(output: &CapturedOutput) -> Result<(), BuildError> {
    if output.success && output.stderr.is_empty() {
        return Ok(());
    }

    let diagnostic = if !output.stderr.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else if !output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stdout).into_owned()
    } else {
        format!("renderer exited with {}", output.status)
    };
    Err(BuildError::RendererReportedError { diagnostic })
}
