//! Bounded TTL cache over the VCS dirty-file set.

use crate::clock::Clock;
use satori_domain::SEARCH_CHANGED_FILES_CACHE_TTL_MS;
use satori_ports::VcsPort;
use satori_shared::RequestContext;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::Mutex;

/// Outcome of a changed-files lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFilesProbe {
    /// False when no probe has ever succeeded for the root.
    pub available: bool,
    /// Tracked dirty files, relative to the root.
    pub files: BTreeSet<Box<str>>,
}

impl ChangedFilesProbe {
    /// The unavailable result.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            available: false,
            files: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedProbe {
    fetched_at_ms: u64,
    files: BTreeSet<Box<str>>,
}

/// TTL cache keyed by canonical root.
///
/// Expired entries refresh lazily; a failed refresh serves the previous value
/// when one exists.
pub struct ChangedFilesCache {
    ttl_ms: u64,
    entries: Mutex<BTreeMap<String, CachedProbe>>,
}

impl Default for ChangedFilesCache {
    fn default() -> Self {
        Self::new(SEARCH_CHANGED_FILES_CACHE_TTL_MS)
    }
}

impl ChangedFilesCache {
    /// Create a cache with an explicit TTL.
    #[must_use]
    pub const fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: Mutex::const_new(BTreeMap::new()),
        }
    }

    /// Fetch the dirty set for `root`, refreshing when the entry expired.
    pub async fn get(
        &self,
        ctx: &RequestContext,
        vcs: &dyn VcsPort,
        clock: &dyn Clock,
        canonical_root: &str,
    ) -> ChangedFilesProbe {
        let now = clock.now_ms();

        {
            let entries = self.entries.lock().await;
            if let Some(cached) = entries.get(canonical_root)
                && now.saturating_sub(cached.fetched_at_ms) < self.ttl_ms
            {
                return ChangedFilesProbe {
                    available: true,
                    files: cached.files.clone(),
                };
            }
        }

        match vcs.changed_files(ctx, Path::new(canonical_root)).await {
            Ok(changed) => {
                let files: BTreeSet<Box<str>> = changed.files.into_iter().collect();
                let mut entries = self.entries.lock().await;
                entries.insert(
                    canonical_root.to_owned(),
                    CachedProbe {
                        fetched_at_ms: now,
                        files: files.clone(),
                    },
                );
                ChangedFilesProbe {
                    available: true,
                    files,
                }
            },
            Err(_) => {
                let entries = self.entries.lock().await;
                entries.get(canonical_root).map_or_else(
                    ChangedFilesProbe::unavailable,
                    |stale| ChangedFilesProbe {
                        available: true,
                        files: stale.files.clone(),
                    },
                )
            },
        }
    }
}
