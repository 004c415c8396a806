//! Scratch directory for transient renderer output
//!
//! Constructed once at startup and handed to whoever needs it; there is
//! no ambient global.

use std::path::{Path, PathBuf};

/// Process-lifetime directory holding renderer output until it is streamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Remove any existing directory at `path`, create it empty, and
    /// resolve it to an absolute path.
    ///
    /// # Errors
    /// Propagates filesystem errors from removal, creation or canonicalisation.
    pub fn recreate(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        match std::fs::remove_dir_all(path) {
            Ok(()) => tracing::debug!("Removed stale scratch directory {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        std::fs::create_dir_all(path)?;
        let root = path.canonicalize()?;
        tracing::info!("Scratch directory ready at {}", root.display());
        Ok(Self { root })
    }

    /// Wrap an existing directory without touching it
    #[inline]
    #[must_use]
    pub fn existing(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute root of the directory
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the directory
    #[inline]
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
