//! Indexing context boundary contract.
//!
//! The context owns collection naming, the index build/sync/clear machinery,
//! the completion marker document, and ignore/tracked-path queries. The core
//! drives it and never reaches past it into the store schema.

use crate::BoxFuture;
use satori_domain::{CollectionName, CompletionMarker};
use satori_shared::{RequestContext, Result};
use serde_json::Value;
use std::path::Path;

/// Outcome of a full index build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOutcome {
    /// Files indexed.
    pub indexed_files: u64,
    /// Chunks stored.
    pub total_chunks: u64,
}

/// Outcome of an incremental reindex over changed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncDelta {
    /// Files added.
    pub added: u64,
    /// Files removed.
    pub removed: u64,
    /// Files modified.
    pub modified: u64,
}

impl SyncDelta {
    /// Total changes in the delta.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.added + self.removed + self.modified
    }
}

/// Progress callback for index builds (percentage 0-100).
pub type ProgressFn = dyn Fn(f64) + Send + Sync;

/// Boundary contract for the indexing context.
pub trait ContextPort: Send + Sync {
    /// Resolve the collection name for a canonical root.
    fn resolve_collection_name(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<CollectionName>>;

    /// Build a full index for the codebase.
    fn index_codebase(
        &self,
        ctx: &RequestContext,
        root: &Path,
        custom_extensions: Vec<Box<str>>,
        ignore_patterns: Vec<Box<str>>,
        on_progress: Option<Box<ProgressFn>>,
    ) -> BoxFuture<'_, Result<IndexOutcome>>;

    /// Reindex only what changed since the last build.
    fn reindex_by_change(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<SyncDelta>>;

    /// Drop all index data for the codebase.
    fn clear_index(&self, ctx: &RequestContext, root: &Path) -> BoxFuture<'_, Result<()>>;

    /// Fetch the raw completion marker document, when present.
    ///
    /// Returns the raw JSON so the validator can classify malformed payloads
    /// instead of surfacing a deserialization error.
    fn get_index_completion_marker(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<Option<Value>>>;

    /// Write the completion marker for a finished run.
    fn write_index_completion_marker(
        &self,
        ctx: &RequestContext,
        root: &Path,
        marker: CompletionMarker,
    ) -> BoxFuture<'_, Result<()>>;

    /// Clear the completion marker (indexing start, failure, clear).
    fn clear_index_completion_marker(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<()>>;

    /// Active ignore patterns for the codebase.
    fn get_active_ignore_patterns(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>>;

    /// Tracked relative paths under the codebase root.
    fn get_tracked_relative_paths(
        &self,
        ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>>;
}
