//! Reciprocal-rank fusion across semantic passes.

use crate::search::passes::PassOutcome;
use satori_domain::{ChunkHit, SEARCH_RRF_K, SearchCandidate, classify_path};
use std::collections::BTreeMap;

/// Fuse pass results into candidates keyed by
/// `(relativePath, startLine, endLine, language)`.
///
/// Each pass contributes `weight / (RRF_K + rank)` (rank is 1-based in the
/// pass's own order); the base score is the best native similarity seen.
#[must_use]
pub fn fuse_passes(passes: &[&PassOutcome]) -> Vec<SearchCandidate> {
    let mut fused: BTreeMap<(Box<str>, u32, u32, Option<satori_domain::Language>), SearchCandidate> =
        BTreeMap::new();

    for pass in passes {
        let Ok(hits) = pass.result.as_ref() else {
            continue;
        };

        for (index, hit) in hits.iter().enumerate() {
            let rank = index + 1;
            #[allow(clippy::cast_precision_loss, reason = "ranks are small")]
            let contribution = pass.weight / (SEARCH_RRF_K + rank as f64);

            let key = hit.fusion_key();
            match fused.get_mut(&key) {
                Some(candidate) => {
                    candidate.fusion_score += contribution;
                    if hit.score > candidate.base_score {
                        candidate.base_score = hit.score;
                    }
                    // Keep the richer hit when a later pass resolved symbols.
                    if candidate.result.symbol_id.is_none() && hit.symbol_id.is_some() {
                        candidate.result = hit.clone();
                    }
                },
                None => {
                    fused.insert(key, new_candidate(hit, contribution));
                },
            }
        }
    }

    fused.into_values().collect()
}

fn new_candidate(hit: &ChunkHit, fusion_score: f64) -> SearchCandidate {
    SearchCandidate {
        base_score: hit.score,
        fusion_score,
        final_score: fusion_score,
        path_category: classify_path(&hit.relative_path),
        path_multiplier: 1.0,
        changed_files_multiplier: 1.0,
        passes_matched_must: false,
        result: hit.clone(),
    }
}
