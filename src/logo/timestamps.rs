//! Modification-time lookup for logo candidates.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::remote::AvailableLogo;

/// Source of modification times for logos listed in publisher storage.
pub trait ModifiedTimeLookup: Send + Sync {
    /// Returns the candidate's modification time, or `None` when unknown.
    fn modified(&self, logo: &AvailableLogo) -> Option<SystemTime>;
}

/// Lookup that knows no timestamps; the heuristic falls back to list order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimestamps;

impl ModifiedTimeLookup for NoTimestamps {
    fn modified(&self, _logo: &AvailableLogo) -> Option<SystemTime> {
        None
    }
}

/// Reads modification times from a local mirror of the logo storage.
///
/// A storage path `logos/acme.png` is looked up as `{root}/logos/acme.png`,
/// then as `{root}/acme.png`. Paths that would escape `root` are ignored.
#[derive(Clone)]
pub struct StorageDirTimestamps {
    root: PathBuf,
}

impl StorageDirTimestamps {
    /// Creates a lookup rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candidates(&self, storage_path: &str) -> Vec<PathBuf> {
        let relative = Path::new(storage_path.trim_start_matches(['/', '\\']));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Vec::new();
        }

        let mut paths = vec![self.root.join(relative)];
        if let Some(file_name) = relative.file_name() {
            let flat = self.root.join(file_name);
            if flat != paths[0] {
                paths.push(flat);
            }
        }
        paths
    }
}

impl fmt::Debug for StorageDirTimestamps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageDirTimestamps")
            .field("root", &self.root.display())
            .finish()
    }
}

impl ModifiedTimeLookup for StorageDirTimestamps {
    fn modified(&self, logo: &AvailableLogo) -> Option<SystemTime> {
        let found = self
            .candidates(&logo.path)
            .into_iter()
            .find_map(|path| std::fs::metadata(&path).and_then(|m| m.modified()).ok());
        if found.is_none() {
            debug!(path = %logo.path, "no modification time for logo candidate");
        }
        found
    }
}
