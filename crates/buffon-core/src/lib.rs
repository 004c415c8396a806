//! Buffon Core - build-request pipeline
//!
//! Turns an inbound plot request into one run of an external renderer and
//! streams the resulting PNG back:
//! 1. **Validation**: kind and parameter shape/type checks
//! 2. **Invocation**: deterministic command line and output path
//! 3. **Runner**: child process with conservative failure classification
//! 4. **Artifact**: chunked streaming with delete-after-send
//!
//! # Example
//!
//! ```rust,ignore
//! use buffon_core::prelude::*;
//!
//! let config = ServiceConfig::new().with_scratch_dir("output");
//! let pipeline = BuildPipeline::from_config(&config)?;
//!
//! match pipeline.build(&query).await {
//!     Delivery::Image(stream) => { stream.write_to(&mut socket).await?; }
//!     Delivery::Diagnostic(text) => { /* reply text/plain */ }
//! }
//! ```

#![warn(unreachable_pub)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod invocation;
pub mod kind;
pub mod locks;
pub mod pipeline;
pub mod runner;
pub mod scratch;
pub mod validation;

pub use artifact::{deliver, ArtifactStream, Delivery, IMAGE_CONTENT_TYPE, TEXT_CONTENT_TYPE};
pub use config::ServiceConfig;
pub use error::BuildError;
pub use invocation::{Invocation, InvocationBuilder, RenderJob};
pub use kind::{EstimateProblem, ParamSpec, ParamType, SimulationKind};
pub use locks::{PathLease, PathLocks};
pub use pipeline::BuildPipeline;
pub use runner::{CapturedOutput, LaunchCommand, Launcher, ProcessRunner, RenderOutcome, SystemLauncher};
pub use scratch::ScratchDir;
pub use validation::{validate, validate_estimate, validate_query, EstimateRequest, ParamValue, SimulationRequest};

/// Common imports
pub mod prelude {
    pub use crate::{
        BuildError, BuildPipeline, Delivery, InvocationBuilder, ProcessRunner, RenderJob,
        RenderOutcome, ScratchDir, ServiceConfig, SimulationKind, SimulationRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
