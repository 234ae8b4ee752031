//! Grouping, diversity caps, and deterministic ordering.

use satori_domain::{
    CallGraphHint, GroupBy, LineSpan, NavigationFallback, ResultMode,
    SEARCH_DIVERSITY_MAX_PER_FILE, SEARCH_DIVERSITY_MAX_PER_SYMBOL,
    SEARCH_DIVERSITY_RELAXED_FILE_CAP, SearchCandidate, SearchGroup, StalenessBucket,
    compare_candidates, compare_groups, fallback_group_id, proximity_bucket,
};
use serde::Serialize;
use std::collections::BTreeMap;

const PREVIEW_MAX_LINES: usize = 6;
const PREVIEW_MAX_CHARS: usize = 280;

/// Diversity summary recorded in the debug envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversitySummary {
    /// Groups selected by the strict pass.
    pub selected_pass1: usize,
    /// True when the relaxed file cap engaged.
    pub relaxed_pass_engaged: bool,
    /// Total groups before diversity.
    pub total_groups: usize,
}

/// Shape the surviving candidates into the visible result list.
pub fn build_results(
    mut candidates: Vec<SearchCandidate>,
    result_mode: ResultMode,
    group_by: GroupBy,
    limit: usize,
    now_ms: u64,
    sidecar_v3_present: bool,
) -> (Vec<SearchGroup>, Option<DiversitySummary>) {
    candidates.sort_by(compare_candidates);

    match result_mode {
        ResultMode::Raw => {
            candidates.truncate(limit);
            let groups = candidates
                .iter()
                .filter_map(|candidate| {
                    group_from_members(
                        std::slice::from_ref(candidate),
                        group_id_for(candidate, group_by),
                        now_ms,
                        sidecar_v3_present,
                    )
                })
                .collect();
            (groups, None)
        },
        ResultMode::Grouped => {
            let mut buckets: BTreeMap<String, Vec<SearchCandidate>> = BTreeMap::new();
            for candidate in candidates {
                buckets
                    .entry(bucket_key(&candidate, group_by))
                    .or_default()
                    .push(candidate);
            }

            let mut groups: Vec<SearchGroup> = buckets
                .into_values()
                .filter_map(|mut members| {
                    sort_members(&mut members);
                    let id = group_id_for(members.first()?, group_by);
                    group_from_members(&members, id, now_ms, sidecar_v3_present)
                })
                .collect();
            groups.sort_by(compare_groups);

            let (selected, summary) = select_diverse(groups, limit);
            (selected, Some(summary))
        },
    }
}

/// Members sort must-satisfied first, then by the standard chain.
fn sort_members(members: &mut [SearchCandidate]) {
    members.sort_by(|a, b| {
        b.passes_matched_must
            .cmp(&a.passes_matched_must)
            .then_with(|| compare_candidates(a, b))
    });
}

fn bucket_key(candidate: &SearchCandidate, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::File => format!("file:{}", candidate.result.relative_path),
        GroupBy::Symbol => match candidate.result.symbol_id.as_deref() {
            Some(symbol_id) => format!("sym:{symbol_id}"),
            None => format!(
                "fb:{}#{}",
                candidate.result.relative_path,
                proximity_bucket(candidate.result.span.start_line())
            ),
        },
    }
}

fn group_id_for(candidate: &SearchCandidate, group_by: GroupBy) -> Box<str> {
    match (group_by, candidate.result.symbol_id.as_deref()) {
        (GroupBy::Symbol, Some(symbol_id)) => Box::from(symbol_id),
        _ => fallback_group_id(&candidate.result.relative_path, candidate.result.span),
    }
}

fn group_from_members(
    members: &[SearchCandidate],
    group_id: Box<str>,
    now_ms: u64,
    sidecar_v3_present: bool,
) -> Option<SearchGroup> {
    let best = members.first()?;

    let span = members
        .iter()
        .map(|member| member.result.span)
        .reduce(LineSpan::union)
        .unwrap_or(best.result.span);

    let indexed_at_ms = members
        .iter()
        .filter_map(|member| member.result.indexed_at_ms)
        .max();

    let file = best.result.relative_path.clone();
    let symbol_id = best.result.symbol_id.clone();

    let supported = sidecar_v3_present && symbol_id.is_some();
    let navigation_fallback = (!supported).then(|| NavigationFallback {
        file: file.clone(),
        start_line: span.start_line(),
        end_line: span.end_line(),
    });

    Some(SearchGroup {
        group_id,
        file,
        span,
        language: best.result.language,
        symbol_id,
        symbol_label: best.result.symbol_label.clone(),
        score: best.final_score,
        indexed_at_ms,
        staleness_bucket: StalenessBucket::from_age_ms(
            indexed_at_ms.map(|at| now_ms.saturating_sub(at)),
        ),
        collapsed_chunk_count: members.len(),
        call_graph_hint: CallGraphHint { supported },
        navigation_fallback,
        preview: preview_of(&best.result.content),
    })
}

fn preview_of(content: &str) -> Box<str> {
    let mut preview: String = content
        .lines()
        .take(PREVIEW_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if preview.len() > PREVIEW_MAX_CHARS {
        let mut cut = PREVIEW_MAX_CHARS;
        while cut > 0 && !preview.is_char_boundary(cut) {
            cut -= 1;
        }
        preview.truncate(cut);
    }
    preview.into_boxed_str()
}

/// Two-pass diversity selection over score-ordered groups.
fn select_diverse(groups: Vec<SearchGroup>, limit: usize) -> (Vec<SearchGroup>, DiversitySummary) {
    let total_groups = groups.len();
    let wanted = limit.min(total_groups);

    let pass1 = select_with_caps(&groups, limit, SEARCH_DIVERSITY_MAX_PER_FILE);
    let selected_pass1 = pass1.len();

    if selected_pass1 >= wanted {
        return (
            pass1,
            DiversitySummary {
                selected_pass1,
                relaxed_pass_engaged: false,
                total_groups,
            },
        );
    }

    let relaxed = select_with_caps(&groups, limit, SEARCH_DIVERSITY_RELAXED_FILE_CAP);
    (
        relaxed,
        DiversitySummary {
            selected_pass1,
            relaxed_pass_engaged: true,
            total_groups,
        },
    )
}

fn select_with_caps(groups: &[SearchGroup], limit: usize, file_cap: usize) -> Vec<SearchGroup> {
    let mut per_file: BTreeMap<Box<str>, usize> = BTreeMap::new();
    let mut per_symbol: BTreeMap<Box<str>, usize> = BTreeMap::new();
    let mut selected = Vec::new();

    for group in groups {
        if selected.len() >= limit {
            break;
        }

        let file_count = per_file.entry(group.file.clone()).or_insert(0);
        if *file_count >= file_cap {
            continue;
        }

        let symbol_key = group
            .symbol_id
            .clone()
            .unwrap_or_else(|| group.group_id.clone());
        let symbol_count = per_symbol.entry(symbol_key).or_insert(0);
        if *symbol_count >= SEARCH_DIVERSITY_MAX_PER_SYMBOL {
            continue;
        }

        *file_count += 1;
        *symbol_count += 1;
        selected.push(group.clone());
    }

    selected
}
