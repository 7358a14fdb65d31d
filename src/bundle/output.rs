//! Output tree preparation, staged replacement and atomic manifest writes.
//!
//! Profiles that own their asset root build the new tree in a sibling staging
//! directory. The staged tree replaces the live one only after the draft
//! manifest is in place, so a run that fails earlier leaves the previous
//! bundle untouched.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{BundleError, BundleWarning};
use crate::manifest::ClientProfile;

/// Staging directory name, created beside the asset root.
const STAGING_DIR: &str = ".questions-staging";

/// Where the replaced asset root is parked until it is deleted.
const PREVIOUS_DIR: &str = ".questions-previous";

/// Resolved locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputPlan {
    /// Live asset root.
    pub asset_root: PathBuf,
    /// Directory the draft is written into: the staging dir, or the asset root.
    pub build_root: PathBuf,
    manifest_file: &'static str,
    staged: bool,
}

impl OutputPlan {
    pub(crate) fn new(strategy: &dyn ClientProfile, output_root: &Path) -> Self {
        let asset_root = strategy.asset_root(output_root);
        let staged = strategy.rebuilds_asset_root();
        let build_root = if staged {
            staging_sibling(&asset_root, STAGING_DIR)
        } else {
            asset_root.clone()
        };
        Self {
            asset_root,
            build_root,
            manifest_file: strategy.manifest_file(),
            staged,
        }
    }

    /// Draft manifest location (inside the staging dir when staged).
    pub(crate) fn draft_manifest_path(&self) -> PathBuf {
        self.build_root.join(self.manifest_file)
    }

    /// Final manifest location.
    pub(crate) fn manifest_path(&self) -> PathBuf {
        self.asset_root.join(self.manifest_file)
    }

    fn previous_dir(&self) -> PathBuf {
        staging_sibling(&self.asset_root, PREVIOUS_DIR)
    }
}

fn staging_sibling(asset_root: &Path, name: &str) -> PathBuf {
    asset_root
        .parent()
        .map_or_else(|| PathBuf::from(name), |parent| parent.join(name))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Creates the build root and the directories the profile writes into.
///
/// A staging directory left behind by an interrupted run is discarded first.
pub(crate) async fn prepare(
    plan: &OutputPlan,
    strategy: &dyn ClientProfile,
) -> Result<(), BundleError> {
    if plan.staged && exists(&plan.build_root).await {
        debug!(path = %plan.build_root.display(), "removing leftover staging directory");
        tokio::fs::remove_dir_all(&plan.build_root)
            .await
            .map_err(|e| BundleError::output(&plan.build_root, e))?;
    }

    let image_dir = plan.build_root.join(strategy.image_dir());
    tokio::fs::create_dir_all(&image_dir)
        .await
        .map_err(|e| BundleError::output(&image_dir, e))?;
    Ok(())
}

/// Writes `bytes` to `path` through a temporary sibling and a rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BundleError::output(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    if let Err(error) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(BundleError::output(&tmp_path, error));
    }
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| BundleError::output(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "manifest written");
    Ok(())
}

/// Moves the staged tree into place. No-op for unstaged plans.
///
/// Returns a warning when the replaced tree could not be deleted afterwards.
pub(crate) async fn commit(plan: &OutputPlan) -> Result<Vec<BundleWarning>, BundleError> {
    if !plan.staged {
        return Ok(Vec::new());
    }

    let previous = plan.previous_dir();
    if exists(&previous).await {
        remove_tree(&previous)
            .await
            .map_err(|e| BundleError::output(&previous, e))?;
    }

    let had_previous = exists(&plan.asset_root).await;
    if had_previous {
        tokio::fs::rename(&plan.asset_root, &previous)
            .await
            .map_err(|e| BundleError::output(&plan.asset_root, e))?;
    }

    if let Err(error) = tokio::fs::rename(&plan.build_root, &plan.asset_root).await {
        if had_previous {
            restore_previous(&previous, &plan.asset_root).await;
        }
        return Err(BundleError::output(&plan.asset_root, error));
    }
    debug!(path = %plan.asset_root.display(), "staged output moved into place");

    let mut warnings = Vec::new();
    if had_previous && let Err(error) = remove_tree(&previous).await {
        warn!(path = %previous.display(), error = %error, "could not remove previous output");
        warnings.push(BundleWarning::StaleOutputCleanup {
            path: previous,
            reason: error.to_string(),
        });
    }
    Ok(warnings)
}

/// Moves the parked tree back after a failed swap. Returns `false` and logs
/// when the previous bundle is stranded at `previous`.
async fn restore_previous(previous: &Path, asset_root: &Path) -> bool {
    match tokio::fs::rename(previous, asset_root).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                previous = %previous.display(),
                asset_root = %asset_root.display(),
                error = %error,
                "could not restore previous output after failed swap"
            );
            false
        }
    }
}

/// Deletes a staging directory after an aborted run. Best effort.
pub(crate) async fn discard(plan: &OutputPlan) {
    if plan.staged
        && exists(&plan.build_root).await
        && let Err(error) = remove_tree(&plan.build_root).await
    {
        warn!(
            path = %plan.build_root.display(),
            error = %error,
            "could not remove staging directory"
        );
    }
}

async fn remove_tree(path: &Path) -> io::Result<()> {
    let metadata = tokio::fs::symlink_metadata(path).await?;
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}
