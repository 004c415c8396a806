//! Build-request pipeline
//!
//! validate → build invocation → lease output path → run renderer → deliver
//!
//! Validation failures return before anything touches the filesystem or
//! spawns a process.

use std::collections::HashMap;
use std::path::Path;

use crate::artifact::{deliver, Delivery};
use crate::config::{absolute, ServiceConfig};
use crate::error::BuildError;
use crate::invocation::InvocationBuilder;
use crate::locks::PathLocks;
use crate::runner::ProcessRunner;
use crate::scratch::ScratchDir;
use crate::validation::{validate_estimate, validate_query, SimulationRequest};

/// The consolidated build pipeline, shared by every request
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    builder: InvocationBuilder,
    runner: ProcessRunner,
    locks: PathLocks,
}

impl BuildPipeline {
    /// Assemble a pipeline from its parts
    #[must_use]
    pub fn new(builder: InvocationBuilder, runner: ProcessRunner) -> Self {
        Self {
            builder,
            runner,
            locks: PathLocks::new(),
        }
    }

    /// Assemble a pipeline from configuration.
    ///
    /// Recreates the scratch directory and resolves the renderer directory
    /// to an absolute path.
    ///
    /// # Errors
    /// Filesystem errors while preparing either directory.
    pub fn from_config(config: &ServiceConfig) -> std::io::Result<Self> {
        let scratch = ScratchDir::recreate(&config.scratch_dir)?;
        let renderer_dir = absolute(&config.renderer_dir)?;
        let runner = ProcessRunner::new()
            .with_interpreter(config.interpreter_path())
            .with_timeout(config.render_timeout());
        Ok(Self::new(InvocationBuilder::new(renderer_dir, scratch), runner))
    }

    /// Scratch directory in use
    #[inline]
    #[must_use]
    pub fn scratch(&self) -> &ScratchDir {
        self.builder.scratch()
    }

    /// Renderer directory in use
    #[inline]
    #[must_use]
    pub fn renderer_dir(&self) -> &Path {
        self.builder.renderer_dir()
    }

    /// Output-path lock table
    #[inline]
    #[must_use]
    pub fn locks(&self) -> &PathLocks {
        &self.locks
    }

    /// Handle a `/build` query end to end
    pub async fn build(&self, query: &HashMap<String, String>) -> Delivery {
        match validate_query(query) {
            Ok(req) => self.render(&req).await,
            Err(err) => {
                tracing::info!("Rejected build request: {}", err);
                Delivery::Diagnostic(err.diagnostic())
            }
        }
    }

    /// Render a validated request and deliver the artifact
    pub async fn render(&self, req: &SimulationRequest) -> Delivery {
        let job = self.builder.build(req);
        tracing::info!(
            kind = %req.kind(),
            output = %job.output_path.display(),
            "Rendering"
        );

        let lease = match self.runner.timeout() {
            Some(limit) => {
                let acquired = tokio::time::timeout(limit, self.locks.acquire(&job.output_path)).await;
                match acquired {
                    Ok(lease) => lease,
                    Err(_) => {
                        let err = BuildError::LeaseTimedOut {
                            path: job.output_path,
                            waited: limit,
                        };
                        tracing::warn!("{}", err);
                        return Delivery::Diagnostic(err.diagnostic());
                    }
                }
            }
            None => self.locks.acquire(&job.output_path).await,
        };
        let outcome = self.runner.run(&job).await;
        deliver(outcome, Some(lease)).await
    }

    /// Handle an `/api` estimate query, returning the renderer's report
    ///
    /// # Errors
    /// Validation errors, or any renderer failure.
    pub async fn estimate(&self, query: &HashMap<String, String>) -> Result<String, BuildError> {
        let req = validate_estimate(query)?;
        let invocation = self.builder.build_estimate(&req);
        tracing::info!(problem = %req.problem, trials = %req.trials, "Running estimate");
        self.runner.capture(&invocation).await
    }
}
