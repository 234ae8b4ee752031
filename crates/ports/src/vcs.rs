//! Version-control boundary contract.

use crate::BoxFuture;
use satori_shared::{RequestContext, Result};
use std::path::Path;

/// Dirty-file listing from the VCS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangedFiles {
    /// Tracked files with uncommitted changes, relative to the root.
    ///
    /// Untracked files are never listed.
    pub files: Vec<Box<str>>,
}

/// Boundary contract for VCS status probes.
pub trait VcsPort: Send + Sync {
    /// List tracked dirty files under `root`.
    fn changed_files(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<ChangedFiles>>;
}
