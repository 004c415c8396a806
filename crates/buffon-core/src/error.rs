//! Error types for the build-request pipeline
//!
//! Every failure is scoped to a single request. Validation errors
//! short-circuit before any process is launched; renderer errors carry
//! the renderer's own diagnostic text; cleanup errors are only logged.

use std::path::PathBuf;
use std::time::Duration;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Requested kind is not one of the enumerated identifiers
    #[error("unsupported simulation: {0}")]
    UnsupportedKind(String),

    /// A required parameter is absent or does not parse as its type
    #[error("missing or invalid parameter: {name}")]
    MissingOrInvalidParameter {
        /// Query key of the offending parameter
        name: &'static str,
    },

    /// The renderer process could not be started
    #[error("failed to launch renderer {}: {source}", program.display())]
    RendererLaunchFailure {
        /// Program that was launched
        program: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Renderer wrote to stderr or exited non-zero
    #[error("{diagnostic}")]
    RendererReportedError {
        /// Captured stderr, or stdout when stderr was empty
        diagnostic: String,
    },

    /// Renderer exceeded the configured bounded wait and was killed
    #[error("renderer timed out after {secs}s")]
    RendererTimedOut {
        /// Configured timeout
        secs: u64,
    },

    /// An identical request still held the output path when the bounded
    /// wait ran out
    #[error("timed out after {waited:?} waiting for {}", path.display())]
    LeaseTimedOut {
        /// Contended output path
        path: PathBuf,
        /// Configured timeout
        waited: Duration,
    },

    /// I/O error while opening or copying the artifact
    #[error("failed to stream {}: {source}", path.display())]
    StreamingFailure {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Transient artifact could not be removed
    #[error("failed to remove {}: {source}", path.display())]
    CleanupFailure {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl BuildError {
    /// True for errors raised before any process is launched
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKind(_) | Self::MissingOrInvalidParameter { .. }
        )
    }

    /// Plain-text body reported to the caller
    #[must_use]
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}
