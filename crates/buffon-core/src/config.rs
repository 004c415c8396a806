//! Service configuration
//!
//! Layering (lowest first): defaults, TOML file, `PORT`, command-line flags.
//! Only the first two live here; the binary applies the rest.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::BuildError;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable overriding the port
pub const PORT_ENV: &str = "PORT";

/// Process-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listening port
    pub port: u16,
    /// Root of the static front-end
    pub public_dir: PathBuf,
    /// Scratch directory, recreated empty at startup
    pub scratch_dir: PathBuf,
    /// Directory holding the renderer scripts; also their working directory
    pub renderer_dir: PathBuf,
    /// Program used to run renderer scripts; empty runs them directly
    pub interpreter: String,
    /// Bounded wait for a renderer, unbounded when unset
    pub render_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            public_dir: PathBuf::from("public"),
            scratch_dir: PathBuf::from("output"),
            renderer_dir: PathBuf::from("."),
            interpreter: "python".to_string(),
            render_timeout_secs: None,
        }
    }
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; absent keys keep their defaults
    ///
    /// # Errors
    /// `Config` on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, BuildError> {
        toml::from_str(text).map_err(|e| BuildError::Config(e.to_string()))
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// With port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// With public directory
    #[inline]
    #[must_use]
    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    /// With scratch directory
    #[inline]
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// With renderer directory
    #[inline]
    #[must_use]
    pub fn with_renderer_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.renderer_dir = dir.into();
        self
    }

    /// With interpreter; empty string launches renderers directly
    #[inline]
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// With renderer timeout
    #[inline]
    #[must_use]
    pub fn with_render_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.render_timeout_secs = secs;
        self
    }

    /// Interpreter, if renderers are not launched directly
    #[must_use]
    pub fn interpreter_path(&self) -> Option<PathBuf> {
        let trimmed = self.interpreter.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Renderer timeout as a duration
    #[must_use]
    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve `path` against the current working directory
///
/// # Errors
/// Propagates failure to read the working directory.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ServiceConfig::new();
        assert_eq!(config.port, 8080);
        assert_eq!(config.scratch_dir, PathBuf::from("output"));
        assert_eq!(config.interpreter_path(), Some(PathBuf::from("python")));
        assert_eq!(config.render_timeout(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            port = 9000
            interpreter = ""
            render_timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            ServiceConfig::new()
                .with_port(9000)
                .with_interpreter("")
                .with_render_timeout_secs(Some(30))
        );
        assert_eq!(config.interpreter_path(), None);
        assert_eq!(config.render_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ServiceConfig::from_toml_str("prot = 1").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ServiceConfig::load(tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn absolute_keeps_absolute_paths() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(absolute(tmp.path()).unwrap(), tmp.path());
        assert!(absolute(Path::new("renderers")).unwrap().is_absolute());
    }
}
