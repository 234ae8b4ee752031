//! The two semantic passes.

use crate::deps::AppDeps;
use satori_domain::{
    ChunkHit, SEARCH_EXPANDED_QUERY_SUFFIX, SEARCH_MAX_CANDIDATES, SEARCH_PASS_WEIGHT_EXPANDED,
    SEARCH_PASS_WEIGHT_PRIMARY, SEARCH_SIMILARITY_FLOOR,
};
use satori_shared::{RequestContext, Result, settle_all2};
use std::path::Path;

/// Pass identifiers (stable, used in warnings).
pub const PASS_PRIMARY: &str = "primary";
/// Expanded pass identifier.
pub const PASS_EXPANDED: &str = "expanded";

/// Outcome of one semantic pass.
#[derive(Debug)]
pub struct PassOutcome {
    /// Pass id.
    pub id: &'static str,
    /// RRF weight of this pass.
    pub weight: f64,
    /// Candidates requested.
    pub requested: u32,
    /// The pass result.
    pub result: Result<Vec<ChunkHit>>,
}

impl PassOutcome {
    /// True when the pass failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.result.is_err()
    }
}

/// Per-pass candidate budget: `clamp(max(limit*8, 32), 1, MAX_CANDIDATES)`.
#[must_use]
pub const fn initial_candidate_limit(limit: u32) -> u32 {
    let wanted = limit.saturating_mul(8);
    let wanted = if wanted < 32 { 32 } else { wanted };
    if wanted > SEARCH_MAX_CANDIDATES {
        SEARCH_MAX_CANDIDATES
    } else if wanted == 0 {
        1
    } else {
        wanted
    }
}

/// Run the primary and expanded passes in parallel.
///
/// Passes settle independently: one may fail without aborting the sibling.
pub async fn run_passes(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &Path,
    semantic_query: &str,
    candidate_limit: u32,
) -> (PassOutcome, PassOutcome) {
    let expanded_query = format!("{semantic_query} {SEARCH_EXPANDED_QUERY_SUFFIX}");

    let primary = deps.embedding.semantic_search(
        ctx,
        root,
        semantic_query.into(),
        candidate_limit,
        SEARCH_SIMILARITY_FLOOR,
    );
    let expanded = deps.embedding.semantic_search(
        ctx,
        root,
        expanded_query.into_boxed_str(),
        candidate_limit,
        SEARCH_SIMILARITY_FLOOR,
    );

    let (primary_result, expanded_result) = settle_all2(primary, expanded).await;

    (
        PassOutcome {
            id: PASS_PRIMARY,
            weight: SEARCH_PASS_WEIGHT_PRIMARY,
            requested: candidate_limit,
            result: primary_result,
        },
        PassOutcome {
            id: PASS_EXPANDED,
            weight: SEARCH_PASS_WEIGHT_EXPANDED,
            requested: candidate_limit,
            result: expanded_result,
        },
    )
}
