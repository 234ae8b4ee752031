//! Final scoring: path multipliers and the changed-files boost.

use crate::changed_files::ChangedFilesProbe;
use satori_domain::{
    RankingMode, SEARCH_CHANGED_FIRST_MAX_CHANGED_FILES, SEARCH_CHANGED_FIRST_MULTIPLIER,
    SearchCandidate, SearchScope, scope_path_multiplier,
};
use std::collections::BTreeSet;

/// The dirty set eligible for boosting, when any.
///
/// The boost applies only under `auto_changed_first`, with a successful
/// probe, and a non-empty dirty set no larger than the threshold (a huge
/// dirty set would bias scoring toward the whole branch).
#[must_use]
pub fn boostable_changed_files(
    ranking_mode: RankingMode,
    probe: Option<&ChangedFilesProbe>,
) -> Option<BTreeSet<Box<str>>> {
    if ranking_mode != RankingMode::AutoChangedFirst {
        return None;
    }
    let probe = probe?;
    if !probe.available
        || probe.files.is_empty()
        || probe.files.len() > SEARCH_CHANGED_FIRST_MAX_CHANGED_FILES
    {
        return None;
    }
    Some(probe.files.clone())
}

/// Apply `final = fusion * pathMultiplier * changedFilesMultiplier`.
pub fn apply_scoring(
    candidates: &mut [SearchCandidate],
    scope: SearchScope,
    changed_files: Option<&BTreeSet<Box<str>>>,
) {
    for candidate in candidates {
        candidate.path_multiplier = scope_path_multiplier(scope, candidate.path_category);
        candidate.changed_files_multiplier = changed_files
            .is_some_and(|files| files.contains(candidate.result.relative_path.as_ref()))
            .then_some(SEARCH_CHANGED_FIRST_MULTIPLIER)
            .unwrap_or(1.0);
        candidate.final_score =
            candidate.fusion_score * candidate.path_multiplier * candidate.changed_files_multiplier;
    }
}
