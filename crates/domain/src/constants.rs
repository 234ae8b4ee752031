//! Normative constants for the query core.
//!
//! Values here are part of the observable contract: fusion math, retry
//! policy, diversity caps, staleness thresholds, and the dense scope/category
//! multiplier table all read from this module.

use crate::paths::PathCategory;
use crate::search::SearchScope;

/// RRF constant for cross-pass fusion.
pub const SEARCH_RRF_K: f64 = 60.0;

/// Weight applied to the primary semantic pass.
pub const SEARCH_PASS_WEIGHT_PRIMARY: f64 = 1.0;

/// Weight applied to the expanded semantic pass.
pub const SEARCH_PASS_WEIGHT_EXPANDED: f64 = 0.8;

/// Enrichment phrase appended to the semantic query for the expanded pass.
pub const SEARCH_EXPANDED_QUERY_SUFFIX: &str = "implementation definition usage";

/// Similarity floor passed to the vector store for both passes.
pub const SEARCH_SIMILARITY_FLOOR: f32 = 0.3;

/// Upper bound on per-pass candidate requests.
pub const SEARCH_MAX_CANDIDATES: u32 = 256;

/// Extra attempts allowed when `must` filters starve the result set.
pub const SEARCH_MUST_RETRY_ROUNDS: u32 = 2;

/// Candidate-limit growth factor between `must` retries.
pub const SEARCH_MUST_RETRY_MULTIPLIER: u32 = 2;

/// Line-bucket width for fallback group ids.
pub const SEARCH_PROXIMITY_WINDOW: u32 = 40;

/// Number of candidates handed to the reranker.
pub const SEARCH_RERANK_TOP_K: usize = 32;

/// RRF constant for reranker fusion.
pub const SEARCH_RERANK_RRF_K: f64 = 60.0;

/// Weight of the reranker contribution added into the fusion score.
pub const SEARCH_RERANK_WEIGHT: f64 = 1.0;

/// Maximum content lines included in a reranker document.
pub const SEARCH_RERANK_DOC_MAX_LINES: usize = 40;

/// Maximum content characters included in a reranker document.
pub const SEARCH_RERANK_DOC_MAX_CHARS: usize = 2000;

/// Pass-1 diversity cap per file.
pub const SEARCH_DIVERSITY_MAX_PER_FILE: usize = 3;

/// Pass-1 diversity cap per symbol.
pub const SEARCH_DIVERSITY_MAX_PER_SYMBOL: usize = 2;

/// Relaxed per-file cap used when pass 1 under-fills.
pub const SEARCH_DIVERSITY_RELAXED_FILE_CAP: usize = 5;

/// TTL for the changed-files cache, keyed by canonical root.
pub const SEARCH_CHANGED_FILES_CACHE_TTL_MS: u64 = 15_000;

/// Score multiplier applied to VCS-dirty files under `auto_changed_first`.
pub const SEARCH_CHANGED_FIRST_MULTIPLIER: f64 = 1.15;

/// Dirty-set size above which the changed-files boost is skipped.
pub const SEARCH_CHANGED_FIRST_MAX_CHANGED_FILES: usize = 200;

/// Files sampled for the noise-ratio hint.
pub const SEARCH_NOISE_HINT_TOP_K: usize = 10;

/// Noise ratio at or above which the mitigation hint is attached.
pub const SEARCH_NOISE_HINT_THRESHOLD: f64 = 0.5;

/// Suggested ignore patterns in the noise mitigation hint.
pub const SEARCH_NOISE_HINT_PATTERNS: [&str; 5] = [
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/__tests__/**",
    "**/*.min.js",
];

/// Character cap for the query operator prefix block.
pub const SEARCH_OPERATOR_PREFIX_MAX_CHARS: usize = 512;

/// Age below which a result is `fresh`.
pub const STALENESS_FRESH_MS: u64 = 86_400_000;

/// Age below which a result is `aging` (above it: `stale`).
pub const STALENESS_AGING_MS: u64 = 604_800_000;

/// Grace period before an `indexing` entry is considered stalled.
pub const STALE_INDEXING_RECOVERY_GRACE_MS: u64 = 600_000;

/// Watcher debounce window, also used as the blocked-operation retry hint.
pub const WATCHER_DEBOUNCE_MS: u64 = 2_000;

/// Schema version tag carried by the runtime fingerprint.
pub const SCHEMA_VERSION: &str = "hybrid_v3";

/// Sidecar version this core reads.
pub const SIDECAR_VERSION: &str = "v3";

/// Maximum call-graph traversal depth.
pub const CALL_GRAPH_MAX_DEPTH: u32 = 3;

/// Score multiplier for a `(scope, category)` pair.
///
/// The table is dense: every pair is defined, including pairs the scope
/// filter removes before scoring.
#[must_use]
pub const fn scope_path_multiplier(scope: SearchScope, category: PathCategory) -> f64 {
    match scope {
        SearchScope::Runtime => match category {
            PathCategory::Docs => 0.3,
            PathCategory::Tests => 0.4,
            PathCategory::Generated => 0.2,
            PathCategory::Entrypoint => 1.25,
            PathCategory::Core => 1.3,
            PathCategory::SrcRuntime => 1.15,
            PathCategory::Neutral => 1.0,
            PathCategory::Fixtures => 0.35,
        },
        SearchScope::Mixed => match category {
            PathCategory::Docs => 0.9,
            PathCategory::Tests => 0.8,
            PathCategory::Generated => 0.4,
            PathCategory::Entrypoint => 1.1,
            PathCategory::Core => 1.15,
            PathCategory::SrcRuntime => 1.05,
            PathCategory::Neutral => 1.0,
            PathCategory::Fixtures => 0.7,
        },
        SearchScope::Docs => match category {
            PathCategory::Docs => 1.3,
            PathCategory::Tests => 1.0,
            PathCategory::Generated => 0.3,
            PathCategory::Entrypoint => 0.8,
            PathCategory::Core => 0.8,
            PathCategory::SrcRuntime => 0.8,
            PathCategory::Neutral => 1.0,
            PathCategory::Fixtures => 0.9,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_table_is_dense_and_positive() {
        let scopes = [SearchScope::Runtime, SearchScope::Mixed, SearchScope::Docs];
        let categories = [
            PathCategory::Docs,
            PathCategory::Tests,
            PathCategory::Generated,
            PathCategory::Entrypoint,
            PathCategory::Core,
            PathCategory::SrcRuntime,
            PathCategory::Neutral,
            PathCategory::Fixtures,
        ];

        for scope in scopes {
            for category in categories {
                let multiplier = scope_path_multiplier(scope, category);
                assert!(multiplier > 0.0, "{scope:?}/{category:?}");
            }
        }
    }

    #[test]
    fn runtime_scope_prefers_core_over_docs() {
        assert!(
            scope_path_multiplier(SearchScope::Runtime, PathCategory::Core)
                > scope_path_multiplier(SearchScope::Runtime, PathCategory::Docs)
        );
    }

    #[test]
    fn staleness_thresholds_are_ordered() {
        assert!(STALENESS_FRESH_MS < STALENESS_AGING_MS);
    }
}
