//! Property-based invariants over the pure pipeline stages.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use satori_app::search::filters::{PathMatchers, apply_filters};
use satori_app::search::fusion::fuse_passes;
use satori_app::search::grouping::build_results;
use satori_app::search::passes::{PASS_EXPANDED, PASS_PRIMARY, PassOutcome};
use satori_domain::{
    ChunkHit, GroupBy, Language, LineSpan, ResultMode, SEARCH_DIVERSITY_MAX_PER_FILE,
    SEARCH_DIVERSITY_MAX_PER_SYMBOL, SEARCH_PASS_WEIGHT_EXPANDED, SEARCH_PASS_WEIGHT_PRIMARY,
    SearchScope, parse_query,
};

fn hit(path: String, start: u32, score: f32, symbol: Option<String>) -> Option<ChunkHit> {
    let span = LineSpan::new(start, start + 4).ok()?;
    Some(ChunkHit {
        relative_path: path.into_boxed_str(),
        span,
        language: Some(Language::Rust),
        content: format!("content at {start}").into_boxed_str(),
        symbol_id: symbol.clone().map(String::into_boxed_str),
        symbol_label: symbol.map(String::into_boxed_str),
        indexed_at_ms: None,
        score,
    })
}

fn pass(id: &'static str, weight: f64, hits: Vec<ChunkHit>) -> PassOutcome {
    PassOutcome {
        id,
        weight,
        requested: 32,
        result: Ok(hits),
    }
}

fn arbitrary_hits() -> impl Strategy<Value = Vec<ChunkHit>> {
    prop::collection::vec(
        (
            "[a-d]",
            1u32..200,
            0.0f32..1.0,
            prop::option::of("[a-z]{3,6}"),
        ),
        0..24,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .filter_map(|(file, start, score, symbol)| {
                hit(format!("src/{file}.rs"), start, score, symbol)
            })
            .collect()
    })
}

proptest! {
    /// Fusion and grouping are deterministic given identical inputs.
    #[test]
    fn fusion_and_grouping_are_deterministic(hits in arbitrary_hits()) {
        let run = || {
            let primary = pass(PASS_PRIMARY, SEARCH_PASS_WEIGHT_PRIMARY, hits.clone());
            let expanded = pass(PASS_EXPANDED, SEARCH_PASS_WEIGHT_EXPANDED, hits.clone());
            let fused = fuse_passes(&[&primary, &expanded]);
            build_results(fused, ResultMode::Grouped, GroupBy::Symbol, 10, 1_000, false)
        };

        let (first, _) = run();
        let (second, _) = run();
        prop_assert_eq!(first, second);
    }

    /// RRF monotonicity: a strictly better rank in one pass, uncontradicted
    /// by the other, never scores lower.
    #[test]
    fn rrf_is_rank_monotonic(scores in prop::collection::vec(0.1f32..1.0, 2..12)) {
        let mut hits: Vec<ChunkHit> = Vec::new();
        for (index, score) in scores.iter().enumerate() {
            if let Some(hit) = hit(
                format!("src/file_{index:02}.rs"),
                1 + u32::try_from(index).unwrap_or(0) * 10,
                *score,
                None,
            ) {
                hits.push(hit);
            }
        }
        // Pass order is the ranking: sort descending by score.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        let primary = pass(PASS_PRIMARY, SEARCH_PASS_WEIGHT_PRIMARY, hits.clone());
        let fused = fuse_passes(&[&primary]);

        let mut by_rank: Vec<f64> = hits
            .iter()
            .map(|ranked| {
                fused
                    .iter()
                    .find(|candidate| candidate.result.relative_path == ranked.relative_path)
                    .map_or(0.0, |candidate| candidate.fusion_score)
            })
            .collect();

        let mut previous = f64::INFINITY;
        for score in by_rank.drain(..) {
            prop_assert!(score <= previous);
            previous = score;
        }
    }

    /// Diversity caps: pass 1 never admits more than the per-file or
    /// per-symbol caps.
    #[test]
    fn diversity_caps_hold(hits in arbitrary_hits()) {
        let primary = pass(PASS_PRIMARY, SEARCH_PASS_WEIGHT_PRIMARY, hits);
        let fused = fuse_passes(&[&primary]);
        let (groups, summary) =
            build_results(fused, ResultMode::Grouped, GroupBy::Symbol, 8, 1_000, false);

        if let Some(summary) = summary
            && !summary.relaxed_pass_engaged
        {
            let mut per_file = std::collections::BTreeMap::new();
            let mut per_symbol = std::collections::BTreeMap::new();
            for group in &groups {
                *per_file.entry(group.file.clone()).or_insert(0usize) += 1;
                let key = group
                    .symbol_id
                    .clone()
                    .unwrap_or_else(|| group.group_id.clone());
                *per_symbol.entry(key).or_insert(0usize) += 1;
            }
            prop_assert!(per_file.values().all(|count| *count <= SEARCH_DIVERSITY_MAX_PER_FILE));
            prop_assert!(
                per_symbol.values().all(|count| *count <= SEARCH_DIVERSITY_MAX_PER_SYMBOL)
            );
        }
    }

    /// `must` is an AND and `exclude` is an ANY across the field set.
    #[test]
    fn must_and_exclude_semantics(hits in arbitrary_hits()) {
        let primary = pass(PASS_PRIMARY, SEARCH_PASS_WEIGHT_PRIMARY, hits);
        let fused = fuse_passes(&[&primary]);

        let parsed = parse_query("must:content must:src exclude:file_zz query");
        let matchers = PathMatchers::compile(&parsed)
            .map_err(|_| TestCaseError::fail("matcher compile failed"))?;
        let (survivors, _) = apply_filters(fused, SearchScope::Mixed, &parsed, &matchers);

        for candidate in survivors {
            let haystacks = [
                candidate.result.symbol_label.as_deref().unwrap_or("").to_ascii_lowercase(),
                candidate.result.relative_path.to_ascii_lowercase(),
                candidate.result.content.to_ascii_lowercase(),
            ];
            prop_assert!(
                ["content", "src"].iter().all(|token| haystacks
                    .iter()
                    .any(|haystack| haystack.contains(token)))
            );
            prop_assert!(
                !haystacks.iter().any(|haystack| haystack.contains("file_zz"))
            );
        }
    }
}
