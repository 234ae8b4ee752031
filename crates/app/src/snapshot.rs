//! Persistent per-codebase snapshot store.
//!
//! One JSON file maps canonical roots to `CodebaseEntry` records. Every
//! mutation persists via atomic write-then-rename before the caller observes
//! it; `last_updated_ms` is monotonic per entry.

use satori_domain::{CodebaseEntry, CodebaseStatus, FingerprintSource, IndexFingerprint};
use satori_shared::{Result, atomic_write_json, read_json_if_exists};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

type SnapshotMap = BTreeMap<String, CodebaseEntry>;

/// Shared snapshot store guarding all per-codebase state.
pub struct SnapshotStore {
    path: PathBuf,
    state: Mutex<SnapshotMap>,
}

impl SnapshotStore {
    /// Open the store, loading existing state when present.
    ///
    /// Loading is lenient: an unreadable file starts empty rather than
    /// failing startup (a later mutation rewrites it).
    pub fn open(path: PathBuf) -> Self {
        let state = read_json_if_exists::<SnapshotMap>(&path)
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// Snapshot file location.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read one entry.
    pub async fn get(&self, root: &str) -> Option<CodebaseEntry> {
        let state = self.state.lock().await;
        state.get(root).cloned()
    }

    /// All entries, ordered by canonical root.
    pub async fn entries(&self) -> Vec<(String, CodebaseEntry)> {
        let state = self.state.lock().await;
        state
            .iter()
            .map(|(root, entry)| (root.clone(), entry.clone()))
            .collect()
    }

    /// Tracked roots that are path-ancestors of (or equal to) `canonical`.
    pub async fn ancestors_of(&self, canonical: &str) -> Vec<(String, CodebaseEntry)> {
        let state = self.state.lock().await;
        state
            .iter()
            .filter(|(root, _)| is_path_ancestor(root, canonical))
            .map(|(root, entry)| (root.clone(), entry.clone()))
            .collect()
    }

    /// Replace an entry's status, stamping a monotonic timestamp.
    pub async fn set_status(&self, root: &str, status: CodebaseStatus, now_ms: u64) -> Result<()> {
        self.mutate(root, now_ms, |entry| {
            entry.status = status;
        })
        .await
    }

    /// Record the fingerprint that produced the current cloud data.
    pub async fn set_fingerprint(
        &self,
        root: &str,
        fingerprint: IndexFingerprint,
        source: FingerprintSource,
        now_ms: u64,
    ) -> Result<()> {
        self.mutate(root, now_ms, |entry| {
            entry.index_fingerprint = Some(fingerprint);
            entry.fingerprint_source = Some(source);
        })
        .await
    }

    /// Flip an entry to `requires_reindex`, recording the reason.
    pub async fn mark_requires_reindex(
        &self,
        root: &str,
        reason: impl Into<Box<str>>,
        now_ms: u64,
    ) -> Result<()> {
        let reason = reason.into();
        self.mutate(root, now_ms, |entry| {
            entry.status = CodebaseStatus::RequiresReindex {
                message: reason.clone(),
            };
            entry.reindex_reason = Some(reason.clone());
        })
        .await
    }

    /// Apply an arbitrary mutation to an entry, creating it when absent.
    ///
    /// The mutation and its persistence happen under the store lock, so a
    /// transition is never observable before it is durable.
    pub async fn mutate<F>(&self, root: &str, now_ms: u64, apply: F) -> Result<()>
    where
        F: FnOnce(&mut CodebaseEntry),
    {
        let mut state = self.state.lock().await;
        let entry = state
            .entry(root.to_owned())
            .or_insert_with(|| CodebaseEntry::new(CodebaseStatus::NotFound, now_ms));

        apply(entry);
        entry.last_updated_ms = entry.last_updated_ms.max(now_ms);

        atomic_write_json(&self.path, &*state)
    }

    /// Remove an entry (explicit `clear`).
    pub async fn remove(&self, root: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.remove(root);
        atomic_write_json(&self.path, &*state)
    }
}

/// True when `ancestor` equals `path` or is a component-boundary prefix.
#[must_use]
pub fn is_path_ancestor(ancestor: &str, path: &str) -> bool {
    if ancestor == path {
        return true;
    }

    let Some(rest) = path.strip_prefix(ancestor) else {
        return false;
    };

    // `/repo` is an ancestor of `/repo/sub`, not of `/repository`.
    ancestor.ends_with('/') || rest.starts_with('/')
}
