//! Per-codebase snapshot entries and the status state machine.

use crate::fingerprint::{FingerprintSource, IndexFingerprint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Status of a tracked codebase.
///
/// Payload fields live on the variant that owns them, so an entry can never
/// hold payload inconsistent with its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CodebaseStatus {
    /// No index exists for the codebase.
    NotFound,
    /// Indexing in progress.
    Indexing {
        /// Completion percentage (0-100).
        indexing_percentage: f64,
    },
    /// Index completed and searchable.
    Indexed {
        /// Number of files indexed.
        indexed_files: u64,
        /// Total chunks stored.
        total_chunks: u64,
    },
    /// Indexing failed.
    #[serde(rename = "indexfailed")]
    IndexFailed {
        /// Human-readable failure reason.
        error_message: Box<str>,
        /// Progress reached before the failure, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        last_attempted_percentage: Option<f64>,
    },
    /// An incremental sync delta was just applied; still searchable.
    SyncCompleted {
        /// Files added by the delta.
        added: u64,
        /// Files removed by the delta.
        removed: u64,
        /// Files modified by the delta.
        modified: u64,
    },
    /// The index is incompatible with the runtime fingerprint.
    RequiresReindex {
        /// Why a reindex is required.
        message: Box<str>,
    },
}

impl CodebaseStatus {
    /// Returns the canonical status tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Indexing { .. } => "indexing",
            Self::Indexed { .. } => "indexed",
            Self::IndexFailed { .. } => "indexfailed",
            Self::SyncCompleted { .. } => "sync_completed",
            Self::RequiresReindex { .. } => "requires_reindex",
        }
    }

    /// True for states the search path may read from (before proof checks).
    #[must_use]
    pub const fn is_searchable(&self) -> bool {
        matches!(self, Self::Indexed { .. } | Self::SyncCompleted { .. })
    }

    /// True when the status claims a completed index exists.
    #[must_use]
    pub const fn claims_ready(&self) -> bool {
        self.is_searchable()
    }
}

/// Pointer to the call-graph sidecar artifact for a codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarPointer {
    /// Sidecar format version (currently `v3`).
    pub version: Box<str>,
    /// Build timestamp.
    pub built_at: DateTime<Utc>,
    /// Node count at build time.
    pub node_count: u64,
    /// Edge count at build time.
    pub edge_count: u64,
    /// Note count at build time.
    pub note_count: u64,
    /// Fingerprint of the index the sidecar was built against.
    pub fingerprint: IndexFingerprint,
    /// Location of the sidecar document on disk.
    pub path: Box<str>,
}

/// Persistent record for one tracked codebase, keyed by canonical root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseEntry {
    /// Current lifecycle status with status-specific payload.
    #[serde(flatten)]
    pub status: CodebaseStatus,
    /// Monotonic last-update timestamp (epoch milliseconds).
    pub last_updated_ms: u64,
    /// Fingerprint that produced the current cloud data, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_fingerprint: Option<IndexFingerprint>,
    /// Provenance of `index_fingerprint`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_source: Option<FingerprintSource>,
    /// Why the entry was flipped to `requires_reindex`, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reindex_reason: Option<Box<str>>,
    /// Call-graph sidecar pointer, when one has been built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_graph_sidecar: Option<SidecarPointer>,
    /// Ordered set of relative paths last indexed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_manifest: Option<BTreeSet<Box<str>>>,
}

impl CodebaseEntry {
    /// Create a fresh entry in the given status.
    #[must_use]
    pub const fn new(status: CodebaseStatus, last_updated_ms: u64) -> Self {
        Self {
            status,
            last_updated_ms,
            index_fingerprint: None,
            fingerprint_source: None,
            reindex_reason: None,
            call_graph_sidecar: None,
            index_manifest: None,
        }
    }

    /// True when the entry carries a v3 sidecar pointer.
    #[must_use]
    pub fn has_v3_sidecar(&self) -> bool {
        self.call_graph_sidecar
            .as_ref()
            .is_some_and(|sidecar| sidecar.version.as_ref() == crate::constants::SIDECAR_VERSION)
    }
}

/// Legal transitions of the status machine.
///
/// `requires_reindex` is reachable from any state (fingerprint mismatch), so
/// it is not listed per-source.
#[must_use]
pub fn transition_allowed(from: &CodebaseStatus, to: &CodebaseStatus) -> bool {
    use CodebaseStatus as S;
    match (from, to) {
        // Fingerprint mismatch may interrupt anything.
        (_, S::RequiresReindex { .. }) => true,
        // `clear` and reconcile repairs re-enter via these.
        (_, S::NotFound) => true,
        (
            S::NotFound | S::Indexed { .. } | S::IndexFailed { .. } | S::RequiresReindex { .. },
            S::Indexing { .. },
        ) => true,
        (S::Indexing { .. }, S::Indexing { .. }) => true, // progress updates
        (S::Indexing { .. }, S::Indexed { .. } | S::IndexFailed { .. }) => true,
        (S::Indexed { .. } | S::SyncCompleted { .. }, S::SyncCompleted { .. }) => true,
        (S::SyncCompleted { .. }, S::Indexed { .. } | S::Indexing { .. }) => true,
        // Reconcile promotes stale local states when the proof is valid.
        (S::IndexFailed { .. }, S::Indexed { .. }) => true,
        _ => false,
    }
}
