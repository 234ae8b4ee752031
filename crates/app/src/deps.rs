//! Shared dependency bundle for the tool handlers.

use crate::changed_files::ChangedFilesCache;
use crate::clock::Clock;
use crate::lifecycle::SyncGuard;
use crate::snapshot::SnapshotStore;
use satori_config::Capabilities;
use satori_domain::IndexFingerprint;
use satori_ports::{
    ContextPort, EmbeddingPort, LoggerPort, RerankerPort, VcsPort, VectorStorePort,
};
use std::sync::Arc;

/// Dependencies required by every handler.
///
/// The snapshot store and changed-files cache are the only process-wide
/// mutable state; everything else is a collaborator behind a port.
#[derive(Clone)]
pub struct AppDeps {
    /// Persistent snapshot store.
    pub snapshot: Arc<SnapshotStore>,
    /// Indexing context collaborator.
    pub context: Arc<dyn ContextPort>,
    /// Embedding engine collaborator.
    pub embedding: Arc<dyn EmbeddingPort>,
    /// Vector store collaborator.
    pub store: Arc<dyn VectorStorePort>,
    /// Reranker collaborator, when configured.
    pub reranker: Option<Arc<dyn RerankerPort>>,
    /// VCS collaborator.
    pub vcs: Arc<dyn VcsPort>,
    /// Changed-files TTL cache.
    pub changed_files: Arc<ChangedFilesCache>,
    /// Per-root sync coalescing guard.
    pub sync_guard: Arc<SyncGuard>,
    /// Resolved reranker capabilities.
    pub capabilities: Capabilities,
    /// The fingerprint every read is gated against.
    pub runtime_fingerprint: IndexFingerprint,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Optional structured logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}
