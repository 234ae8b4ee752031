//! Optional reranker fusion over the top candidates.

use satori_domain::{
    SEARCH_RERANK_DOC_MAX_CHARS, SEARCH_RERANK_DOC_MAX_LINES, SEARCH_RERANK_RRF_K,
    SEARCH_RERANK_TOP_K, SEARCH_RERANK_WEIGHT, SearchCandidate, compare_candidates,
};
use satori_ports::{RerankOptions, RerankerPort};
use satori_shared::RequestContext;

/// Which phase of reranking failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankFailurePhase {
    /// The provider call itself failed.
    ApiCall,
    /// The provider responded with an unusable ranking.
    ParseResults,
}

impl RerankFailurePhase {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiCall => "api_call",
            Self::ParseResults => "parse_results",
        }
    }
}

/// Result of the rerank stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankStage {
    /// Reranking was not attempted (capability absent or scope-suppressed).
    Skipped,
    /// Rerank contributions were fused into the scores.
    Applied,
    /// Reranking failed; pre-rerank order preserved.
    Failed(RerankFailurePhase),
}

/// Rerank document text: `path\nlanguage\nsymbolLabel\n<trimmed content>`.
fn rerank_document(candidate: &SearchCandidate) -> Box<str> {
    let language = candidate
        .result
        .language
        .map(|language| language.as_str())
        .unwrap_or_default();
    let label = candidate.result.symbol_label.as_deref().unwrap_or_default();

    let mut content: String = candidate
        .result
        .content
        .lines()
        .take(SEARCH_RERANK_DOC_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if content.len() > SEARCH_RERANK_DOC_MAX_CHARS {
        let mut cut = SEARCH_RERANK_DOC_MAX_CHARS;
        while cut > 0 && !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
    }

    format!(
        "{}\n{language}\n{label}\n{content}",
        candidate.result.relative_path
    )
    .into_boxed_str()
}

/// Fuse reranker ranks into the top candidates' scores.
///
/// For each returned rank `r` (1-based), adds
/// `RERANK_WEIGHT / (RERANK_RRF_K + r)` into that candidate's fusion score
/// and recomputes the final score. Failures never error the request.
pub async fn apply_rerank(
    ctx: &RequestContext,
    reranker: &dyn RerankerPort,
    semantic_query: &str,
    candidates: &mut Vec<SearchCandidate>,
) -> RerankStage {
    if candidates.is_empty() {
        return RerankStage::Skipped;
    }

    candidates.sort_by(compare_candidates);
    let top_k = candidates.len().min(SEARCH_RERANK_TOP_K);

    let documents: Vec<Box<str>> = candidates
        .iter()
        .take(top_k)
        .map(rerank_document)
        .collect();

    let entries = match reranker
        .rerank(
            ctx,
            semantic_query.into(),
            documents,
            RerankOptions {
                top_k,
                truncation: true,
                return_documents: false,
            },
        )
        .await
    {
        Ok(entries) => entries,
        Err(_) => return RerankStage::Failed(RerankFailurePhase::ApiCall),
    };

    // Validate before mutating anything so a malformed response leaves the
    // pre-rerank order fully intact.
    if entries
        .iter()
        .any(|entry| entry.document_index >= top_k)
    {
        return RerankStage::Failed(RerankFailurePhase::ParseResults);
    }

    for (position, entry) in entries.iter().enumerate() {
        let rank = position + 1;
        #[allow(clippy::cast_precision_loss, reason = "ranks are small")]
        let contribution = SEARCH_RERANK_WEIGHT / (SEARCH_RERANK_RRF_K + rank as f64);
        if let Some(candidate) = candidates.get_mut(entry.document_index) {
            candidate.fusion_score += contribution;
            candidate.final_score = candidate.fusion_score
                * candidate.path_multiplier
                * candidate.changed_files_multiplier;
        }
    }

    candidates.sort_by(compare_candidates);
    RerankStage::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::{ChunkHit, LineSpan, PathCategory};
    use satori_testkit::{RerankScript, ScriptedReranker};

    fn candidate(path: &str, fusion: f64) -> SearchCandidate {
        #[allow(clippy::unwrap_used, reason = "statically valid span")]
        let span = LineSpan::new(1, 4).unwrap();
        SearchCandidate {
            result: ChunkHit {
                relative_path: path.into(),
                span,
                language: None,
                content: "content".into(),
                symbol_id: None,
                symbol_label: None,
                indexed_at_ms: None,
                score: 0.5,
            },
            base_score: 0.5,
            fusion_score: fusion,
            final_score: fusion,
            path_category: PathCategory::SrcRuntime,
            path_multiplier: 1.0,
            changed_files_multiplier: 1.0,
            passes_matched_must: false,
        }
    }

    fn paths(candidates: &[SearchCandidate]) -> Vec<&str> {
        candidates
            .iter()
            .map(|candidate| candidate.result.relative_path.as_ref())
            .collect()
    }

    #[tokio::test]
    async fn identity_rerank_keeps_the_order() {
        let reranker = ScriptedReranker::new(RerankScript::Identity);
        let mut candidates = vec![candidate("a.rs", 0.3), candidate("b.rs", 0.2)];

        let stage = apply_rerank(
            &RequestContext::new_request(),
            &reranker,
            "query",
            &mut candidates,
        )
        .await;

        assert_eq!(stage, RerankStage::Applied);
        assert_eq!(paths(&candidates), vec!["a.rs", "b.rs"]);
    }

    #[tokio::test]
    async fn reversed_rerank_can_flip_close_scores() {
        let reranker = ScriptedReranker::new(RerankScript::Reversed);
        let mut candidates = vec![candidate("a.rs", 0.0301), candidate("b.rs", 0.0300)];

        let stage = apply_rerank(
            &RequestContext::new_request(),
            &reranker,
            "query",
            &mut candidates,
        )
        .await;

        assert_eq!(stage, RerankStage::Applied);
        assert_eq!(paths(&candidates), vec!["b.rs", "a.rs"]);
    }

    #[tokio::test]
    async fn api_failure_preserves_pre_rerank_order() {
        let reranker = ScriptedReranker::new(RerankScript::FailApiCall);
        let mut candidates = vec![candidate("a.rs", 0.3), candidate("b.rs", 0.2)];

        let stage = apply_rerank(
            &RequestContext::new_request(),
            &reranker,
            "query",
            &mut candidates,
        )
        .await;

        assert_eq!(stage, RerankStage::Failed(RerankFailurePhase::ApiCall));
        assert_eq!(paths(&candidates), vec!["a.rs", "b.rs"]);
        assert!((candidates[0].fusion_score - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn invalid_indexes_preserve_pre_rerank_order() {
        let reranker = ScriptedReranker::new(RerankScript::InvalidIndexes);
        let mut candidates = vec![candidate("a.rs", 0.3), candidate("b.rs", 0.2)];

        let stage = apply_rerank(
            &RequestContext::new_request(),
            &reranker,
            "query",
            &mut candidates,
        )
        .await;

        assert_eq!(stage, RerankStage::Failed(RerankFailurePhase::ParseResults));
        assert_eq!(paths(&candidates), vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn documents_are_trimmed() {
        let mut long = candidate("a.rs", 0.3);
        long.result.content = "x".repeat(SEARCH_RERANK_DOC_MAX_CHARS * 2).into_boxed_str();
        let document = rerank_document(&long);
        assert!(document.len() <= SEARCH_RERANK_DOC_MAX_CHARS + 64);
    }
}
