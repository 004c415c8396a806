//! Invocation building
//!
//! Turns a validated request into the exact renderer command line and the
//! output path it must write to. Flag order and file naming both follow
//! `SimulationKind::params()`:
//!
//! ```text
//! <fixed args> <flag1> <v1> ... <flagN> <vN> -o <scratch>/<kind>.<v1>...<vN>.png
//! ```
//!
//! Values are joined with `.` unescaped. Integer-valued parameters always
//! produce distinct names; fractional reals contain the separator and two
//! different requests can in principle map to the same file, in which case
//! they are serialised by [`crate::locks::PathLocks`].

use std::path::{Path, PathBuf};

use crate::scratch::ScratchDir;
use crate::validation::{EstimateRequest, SimulationRequest};

/// Flag preceding the output path
pub const OUTPUT_FLAG: &str = "-o";

/// Separator between file-name components
pub const NAME_SEPARATOR: char = '.';

/// Extension of rendered artifacts
pub const OUTPUT_EXTENSION: &str = "png";

/// A program and its ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Renderer path (inside the renderer directory)
    pub program: PathBuf,
    /// Position-sensitive argument list
    pub args: Vec<String>,
}

/// A fully derived render job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    /// Program and arguments
    pub invocation: Invocation,
    /// File the renderer is asked to write
    pub output_path: PathBuf,
}

/// Builds render jobs against a renderer directory and a scratch directory
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    renderer_dir: PathBuf,
    scratch: ScratchDir,
}

impl InvocationBuilder {
    /// Create a builder
    #[must_use]
    pub fn new(renderer_dir: impl Into<PathBuf>, scratch: ScratchDir) -> Self {
        Self {
            renderer_dir: renderer_dir.into(),
            scratch,
        }
    }

    /// Directory renderers are resolved against
    #[inline]
    #[must_use]
    pub fn renderer_dir(&self) -> &Path {
        &self.renderer_dir
    }

    /// Scratch directory output files are placed in
    #[inline]
    #[must_use]
    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Derive the render job for a validated request. Pure.
    #[must_use]
    pub fn build(&self, req: &SimulationRequest) -> RenderJob {
        let kind = req.kind();
        let output_path = self.scratch.file(&output_file_name(req));

        let mut args: Vec<String> = kind.fixed_args().iter().map(|a| (*a).to_string()).collect();
        for (spec, value) in req.params() {
            args.push(spec.flag.to_string());
            args.push(value.to_string());
        }
        args.push(OUTPUT_FLAG.to_string());
        args.push(output_path.to_string_lossy().into_owned());

        RenderJob {
            invocation: Invocation {
                program: self.renderer_dir.join(kind.renderer()),
                args,
            },
            output_path,
        }
    }

    /// Derive the `run` invocation for an estimate request. Pure.
    #[must_use]
    pub fn build_estimate(&self, req: &EstimateRequest) -> Invocation {
        Invocation {
            program: self
                .renderer_dir
                .join(crate::kind::EstimateProblem::RENDERER),
            args: vec![
                "run".to_string(),
                req.problem.id().to_string(),
                req.length.to_string(),
                req.gap.to_string(),
                crate::kind::EstimateProblem::TRIALS.flag.to_string(),
                req.trials.to_string(),
            ],
        }
    }
}

/// `<kind>.<v1>...<vN>.png` for a validated request
#[must_use]
pub fn output_file_name(req: &SimulationRequest) -> String {
    let mut name = req.kind().id().to_string();
    for (_, value) in req.params() {
        name.push(NAME_SEPARATOR);
        name.push_str(&value.to_string());
    }
    name.push(NAME_SEPARATOR);
    name.push_str(OUTPUT_EXTENSION);
    name
}
