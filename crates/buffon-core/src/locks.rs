//! Per-output-path locking
//!
//! Identical requests derive identical output paths. A lease on the path
//! is held from renderer launch until the artifact has been deleted, so
//! two such requests run one after the other instead of overwriting or
//! deleting each other's file. Distinct paths never contend.
//!
//! The lease lives as long as the response body, so a client that stops
//! reading holds up every identical request behind it. With a render
//! timeout configured the pipeline bounds that wait as well
//! (`BuildError::LeaseTimedOut`); without one the wait is unbounded.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<()>>;

/// Table of per-path locks
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    slots: Arc<DashMap<PathBuf, Slot>>,
}

impl PathLocks {
    /// Create an empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `path`
    pub async fn acquire(&self, path: &Path) -> PathLease {
        let slot = Arc::clone(&self.slots.entry(path.to_path_buf()).or_default());
        let guard = slot.lock_owned().await;
        PathLease {
            path: path.to_path_buf(),
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Number of paths currently leased or awaited
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no path is leased
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Exclusive use of one output path, released on drop
#[derive(Debug)]
pub struct PathLease {
    path: PathBuf,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<DashMap<PathBuf, Slot>>,
}

impl PathLease {
    /// Leased path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        // only the table itself still references an idle slot
        self.slots
            .remove_if(&self.path, |_, slot| Arc::strong_count(slot) == 1);
    }
}
