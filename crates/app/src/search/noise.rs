//! Noise-ratio hint over the visible result list.

use satori_domain::{
    NoiseCategory, SEARCH_NOISE_HINT_PATTERNS, SEARCH_NOISE_HINT_THRESHOLD,
    SEARCH_NOISE_HINT_TOP_K, SearchGroup, WATCHER_DEBOUNCE_MS, classify_noise,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Noise mitigation hint attached when the sampled results are mostly noise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseMitigationHint {
    /// Per-category ratios over the sampled files, rounded to two decimals.
    pub ratios: BTreeMap<Box<str>, f64>,
    /// Recommended scope for a cleaner result set.
    pub recommended_scope: Box<str>,
    /// Watcher debounce window (ms).
    pub debounce_ms: u64,
    /// Suggested ignore patterns.
    pub suggested_ignore_patterns: Vec<Box<str>>,
}

/// Inspect the first `TOP_K` distinct files; attach a hint when the noise
/// ratio (tests+fixtures+docs+generated) reaches the threshold.
#[must_use]
pub fn noise_hint(results: &[SearchGroup]) -> Option<NoiseMitigationHint> {
    let mut sampled: Vec<&str> = Vec::new();
    for group in results {
        if sampled.len() >= SEARCH_NOISE_HINT_TOP_K {
            break;
        }
        if !sampled.contains(&group.file.as_ref()) {
            sampled.push(group.file.as_ref());
        }
    }

    if sampled.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<NoiseCategory, usize> = BTreeMap::new();
    for file in &sampled {
        *counts.entry(classify_noise(file)).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss, reason = "sample sizes are tiny")]
    let sample_size = sampled.len() as f64;
    let noisy: usize = counts
        .iter()
        .filter(|(category, _)| category.is_noise())
        .map(|(_, count)| count)
        .sum();

    #[allow(clippy::cast_precision_loss, reason = "sample sizes are tiny")]
    let noise_ratio = noisy as f64 / sample_size;
    if noise_ratio < SEARCH_NOISE_HINT_THRESHOLD {
        return None;
    }

    let ratios = counts
        .into_iter()
        .map(|(category, count)| {
            #[allow(clippy::cast_precision_loss, reason = "sample sizes are tiny")]
            let ratio = count as f64 / sample_size;
            (Box::from(category.as_str()), round2(ratio))
        })
        .collect();

    Some(NoiseMitigationHint {
        ratios,
        recommended_scope: "runtime".into(),
        debounce_ms: WATCHER_DEBOUNCE_MS,
        suggested_ignore_patterns: SEARCH_NOISE_HINT_PATTERNS
            .iter()
            .map(|pattern| Box::from(*pattern))
            .collect(),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::{CallGraphHint, LineSpan, StalenessBucket};

    fn group(file: &str) -> SearchGroup {
        #[allow(clippy::unwrap_used, reason = "statically valid span")]
        let span = LineSpan::new(1, 4).unwrap();
        SearchGroup {
            group_id: "grp_x".into(),
            file: file.into(),
            span,
            language: None,
            symbol_id: None,
            symbol_label: None,
            score: 0.5,
            indexed_at_ms: None,
            staleness_bucket: StalenessBucket::Unknown,
            collapsed_chunk_count: 1,
            call_graph_hint: CallGraphHint { supported: false },
            navigation_fallback: None,
            preview: "".into(),
        }
    }

    #[test]
    fn noisy_results_attach_the_hint() {
        let results = vec![
            group("tests/a.rs"),
            group("docs/guide.md"),
            group("dist/bundle.min.js"),
            group("src/lib.rs"),
        ];

        let hint = noise_hint(&results);
        let Some(hint) = hint else {
            assert!(false, "hint expected");
            return;
        };
        assert_eq!(hint.recommended_scope.as_ref(), "runtime");
        assert_eq!(hint.ratios.get("tests").copied(), Some(0.25));
        assert_eq!(hint.ratios.get("runtime").copied(), Some(0.25));
        assert_eq!(hint.debounce_ms, WATCHER_DEBOUNCE_MS);
        assert_eq!(hint.suggested_ignore_patterns.len(), 5);
    }

    #[test]
    fn clean_results_attach_nothing() {
        let results = vec![group("src/a.rs"), group("src/b.rs"), group("docs/c.md")];
        assert!(noise_hint(&results).is_none());
    }

    #[test]
    fn sampling_counts_distinct_files_only() {
        let mut results = vec![group("tests/a.rs"); 20];
        results.push(group("src/b.rs"));

        // One noisy file out of two distinct sampled files: ratio 0.5.
        let hint = noise_hint(&results);
        assert!(hint.is_some());
    }

    #[test]
    fn empty_results_attach_nothing() {
        assert!(noise_hint(&[]).is_none());
    }
}
