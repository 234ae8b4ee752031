//! The search use-case: gate, operator parsing, multi-pass retrieval,
//! fusion, filtering, scoring, optional rerank fusion, `must`-retry,
//! grouping, and hints.

pub mod filters;
pub mod fusion;
pub mod grouping;
pub mod noise;
pub mod passes;
pub mod rerank;
pub mod scoring;

pub use grouping::DiversitySummary;
pub use noise::NoiseMitigationHint;
pub use rerank::{RerankFailurePhase, RerankStage};

use crate::deps::AppDeps;
use crate::gate::{
    Compatibility, DebugProofCheck, GateDecision, GateHints, GateStatus, OperationKind,
    check_readiness,
};
use filters::{PathMatchers, RemovalCounts, apply_filters};
use fusion::fuse_passes;
use grouping::build_results;
use noise::noise_hint;
use passes::{initial_candidate_limit, run_passes};
use rerank::apply_rerank;
use satori_domain::{
    GroupBy, ParsedQuery, RankingMode, ResultMode, SEARCH_MAX_CANDIDATES,
    SEARCH_MUST_RETRY_MULTIPLIER, SEARCH_MUST_RETRY_ROUNDS, SearchCandidate, SearchGroup,
    SearchScope, compare_candidates, parse_query,
};
use satori_ports::LogFields;
use satori_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use scoring::{apply_scoring, boostable_changed_files};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Warning: a semantic pass failed (suffix: pass id).
pub const WARN_PASS_FAILED_PREFIX: &str = "SEARCH_PASS_FAILED";
/// Warning: the reranker failed and the pre-rerank order was kept.
pub const WARN_RERANKER_FAILED: &str = "RERANKER_FAILED";
/// Warning: `must` retries exhausted below the requested limit.
pub const WARN_FILTER_MUST_UNSATISFIED: &str = "FILTER_MUST_UNSATISFIED";

/// Search request after argument validation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Requested codebase path (canonicalized by the gate).
    pub path: PathBuf,
    /// Raw query (operators + semantic text).
    pub query: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Result shaping mode.
    pub result_mode: ResultMode,
    /// Grouping key.
    pub group_by: GroupBy,
    /// Ranking mode.
    pub ranking_mode: RankingMode,
    /// Maximum visible results.
    pub limit: u32,
    /// Attach the debug envelope.
    pub debug: bool,
}

/// Sync-manager verdict attached to read envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshnessDecision {
    /// Decision mode (`ok`, `coalesced`, `skipped_*`, ...).
    pub mode: Box<str>,
}

impl FreshnessDecision {
    /// Build a decision from a mode string.
    #[must_use]
    pub fn of(mode: &str) -> Self {
        Self { mode: mode.into() }
    }
}

/// Per-pass debug counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassDebug {
    /// Pass id.
    pub id: Box<str>,
    /// Candidates requested.
    pub requested: u32,
    /// Candidates returned (0 when failed).
    pub returned: usize,
    /// True when the pass failed.
    pub failed: bool,
}

/// Debug envelope for one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSearch {
    /// Attempts executed (1 plus `must` retries).
    pub attempts: u32,
    /// Final per-pass candidate limit.
    pub candidate_limit: u32,
    /// Pass counters from the final attempt.
    pub passes: Vec<PassDebug>,
    /// Fused candidate count before filtering.
    pub fused_candidates: usize,
    /// Removal counts by filter reason.
    pub removals: RemovalCounts,
    /// True when rerank contributions were fused in.
    pub rerank_applied: bool,
    /// Failure phase when reranking failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_failed_phase: Option<Box<str>>,
    /// Diversity summary (grouped mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversity: Option<DiversitySummary>,
}

/// Hints block (`version: 1`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHints {
    /// Noise mitigation hint, when the sampled results are noisy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_mitigation: Option<NoiseMitigationHint>,
    /// Debug envelope, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_search: Option<DebugSearch>,
    /// Proof-probe diagnostics, when the probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_proof_check: Option<DebugProofCheck>,
}

/// Search response envelope (pre-DTO).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Gate classification (`ok`, `not_indexed`, `not_ready`,
    /// `requires_reindex`).
    pub status: GateStatus,
    /// Status-mirroring reason on non-ok envelopes.
    pub reason: Option<Box<str>>,
    /// Canonical effective root, when one resolved.
    pub effective_root: Option<String>,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Deduplicated, sorted warnings.
    pub warnings: Vec<Box<str>>,
    /// Visible results.
    pub results: Vec<SearchGroup>,
    /// Hints block.
    pub hints: SearchHints,
    /// Gate hints (create/reindex/stale-local) for envelope mapping.
    pub gate_hints: GateHints,
    /// Compatibility block (always present on non-ok).
    pub compatibility: Compatibility,
}

impl SearchResponse {
    fn from_gate(decision: GateDecision) -> Self {
        Self {
            status: decision.status,
            reason: decision.reason,
            effective_root: decision.effective_root,
            freshness_decision: FreshnessDecision::of(decision.status.freshness_mode()),
            warnings: Vec::new(),
            results: Vec::new(),
            hints: SearchHints {
                debug_proof_check: decision.debug_proof_check,
                ..SearchHints::default()
            },
            gate_hints: decision.hints,
            compatibility: decision.compatibility,
        }
    }
}

struct AttemptOutcome {
    survivors: Vec<SearchCandidate>,
    removals: RemovalCounts,
    fused_candidates: usize,
    passes: Vec<PassDebug>,
    rerank_stage: RerankStage,
}

/// Execute a search request end to end.
pub async fn handle_search(
    ctx: &RequestContext,
    deps: &AppDeps,
    request: SearchRequest,
) -> Result<SearchResponse> {
    ctx.checkpoint("search.start")?;

    let decision = check_readiness(ctx, deps, &request.path, OperationKind::Search).await?;
    if decision.status != GateStatus::Ok {
        return Ok(SearchResponse::from_gate(decision));
    }

    let Some(root) = decision.effective_root.clone() else {
        return Ok(SearchResponse::from_gate(decision));
    };
    let sidecar_v3_present = decision
        .entry
        .as_ref()
        .is_some_and(satori_domain::CodebaseEntry::has_v3_sidecar);

    log_search_start(deps, &root, &request);

    let parsed = parse_query(&request.query);
    let matchers = PathMatchers::compile(&parsed)?;
    let mut warnings: BTreeSet<Box<str>> = BTreeSet::new();

    let changed_probe = if request.ranking_mode == RankingMode::AutoChangedFirst {
        Some(
            deps.changed_files
                .get(ctx, deps.vcs.as_ref(), deps.clock.as_ref(), &root)
                .await,
        )
    } else {
        None
    };
    let boost_set = boostable_changed_files(request.ranking_mode, changed_probe.as_ref());

    let rerank_wanted = request.scope != SearchScope::Docs
        && deps.capabilities.has_reranker
        && deps.capabilities.default_rerank_enabled
        && deps.reranker.is_some();

    let max_attempts = if parsed.has_must() {
        1 + SEARCH_MUST_RETRY_ROUNDS
    } else {
        1
    };
    let limit = request.limit.max(1);
    let mut candidate_limit = initial_candidate_limit(limit);
    let mut attempts = 0u32;
    let mut outcome: Option<AttemptOutcome> = None;

    while attempts < max_attempts {
        ctx.checkpoint("search.attempt")?;
        attempts += 1;

        let attempt = run_attempt(
            ctx,
            deps,
            Path::new(&root),
            &request,
            &parsed,
            &matchers,
            boost_set.as_ref(),
            rerank_wanted,
            candidate_limit,
            &mut warnings,
        )
        .await?;

        let starved = parsed.has_must() && attempt.survivors.len() < limit as usize;
        let can_grow = candidate_limit < SEARCH_MAX_CANDIDATES && attempts < max_attempts;
        outcome = Some(attempt);

        if !starved {
            break;
        }
        if !can_grow {
            warnings.insert(Box::from(WARN_FILTER_MUST_UNSATISFIED));
            break;
        }

        candidate_limit = candidate_limit
            .saturating_add(1)
            .max(candidate_limit.saturating_mul(SEARCH_MUST_RETRY_MULTIPLIER))
            .min(SEARCH_MAX_CANDIDATES);
    }

    let Some(outcome) = outcome else {
        return Err(ErrorEnvelope::invariant(
            ErrorCode::internal(),
            "search ran zero attempts",
        ));
    };

    // The request-level deadline short-circuits before grouping.
    ctx.checkpoint("search.group")?;

    let (results, diversity) = build_results(
        outcome.survivors,
        request.result_mode,
        request.group_by,
        limit as usize,
        deps.clock.now_ms(),
        sidecar_v3_present,
    );

    let noise = noise_hint(&results);

    let (rerank_applied, rerank_failed_phase) = match outcome.rerank_stage {
        RerankStage::Applied => (true, None),
        RerankStage::Skipped => (false, None),
        RerankStage::Failed(phase) => (false, Some(Box::from(phase.as_str()))),
    };

    let debug_search = request.debug.then(|| DebugSearch {
        attempts,
        candidate_limit,
        passes: outcome.passes,
        fused_candidates: outcome.fused_candidates,
        removals: outcome.removals,
        rerank_applied,
        rerank_failed_phase,
        diversity,
    });

    log_search_completed(deps, &root, results.len(), attempts);

    Ok(SearchResponse {
        status: GateStatus::Ok,
        reason: None,
        effective_root: Some(root),
        freshness_decision: FreshnessDecision::of("ok"),
        warnings: warnings.into_iter().collect(),
        results,
        hints: SearchHints {
            noise_mitigation: noise,
            debug_search,
            debug_proof_check: decision.debug_proof_check,
        },
        gate_hints: decision.hints,
        compatibility: decision.compatibility,
    })
}

#[allow(clippy::too_many_arguments, reason = "attempt wiring is internal")]
async fn run_attempt(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &Path,
    request: &SearchRequest,
    parsed: &ParsedQuery,
    matchers: &PathMatchers,
    boost_set: Option<&BTreeSet<Box<str>>>,
    rerank_wanted: bool,
    candidate_limit: u32,
    warnings: &mut BTreeSet<Box<str>>,
) -> Result<AttemptOutcome> {
    let (primary, expanded) = run_passes(
        ctx,
        deps,
        root,
        parsed.semantic_query.as_ref(),
        candidate_limit,
    )
    .await;

    if primary.failed() && expanded.failed() {
        return Err(ErrorEnvelope::unexpected(
            ErrorCode::transport(),
            "both semantic passes failed",
            ErrorClass::Retriable,
        ));
    }
    for pass in [&primary, &expanded] {
        if pass.failed() {
            warnings.insert(format!("{WARN_PASS_FAILED_PREFIX}:{}", pass.id).into_boxed_str());
        }
    }

    let pass_debug = [&primary, &expanded]
        .iter()
        .map(|pass| PassDebug {
            id: pass.id.into(),
            requested: pass.requested,
            returned: pass.result.as_ref().map_or(0, Vec::len),
            failed: pass.failed(),
        })
        .collect();

    let fused = fuse_passes(&[&primary, &expanded]);
    let fused_candidates = fused.len();

    let (mut survivors, removals) = apply_filters(fused, request.scope, parsed, matchers);
    apply_scoring(&mut survivors, request.scope, boost_set);

    let rerank_stage = if rerank_wanted {
        match deps.reranker.as_ref() {
            Some(reranker) => {
                let stage = apply_rerank(
                    ctx,
                    reranker.as_ref(),
                    parsed.semantic_query.as_ref(),
                    &mut survivors,
                )
                .await;
                if matches!(stage, RerankStage::Failed(_)) {
                    warnings.insert(Box::from(WARN_RERANKER_FAILED));
                }
                stage
            },
            None => RerankStage::Skipped,
        }
    } else {
        RerankStage::Skipped
    };

    survivors.sort_by(compare_candidates);

    Ok(AttemptOutcome {
        survivors,
        removals,
        fused_candidates,
        passes: pass_debug,
        rerank_stage,
    })
}

fn log_search_start(deps: &AppDeps, root: &str, request: &SearchRequest) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = LogFields::new();
        fields.insert("codebaseRoot".into(), Value::String(root.to_owned()));
        fields.insert("scope".into(), Value::String(request.scope.as_str().to_owned()));
        fields.insert("limit".into(), Value::from(request.limit));
        fields.insert("queryLength".into(), Value::from(request.query.len()));
        logger.info("search.start", "Search started", Some(fields));
    }
}

fn log_search_completed(deps: &AppDeps, root: &str, results: usize, attempts: u32) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = LogFields::new();
        fields.insert("codebaseRoot".into(), Value::String(root.to_owned()));
        fields.insert("results".into(), Value::from(results));
        fields.insert("attempts".into(), Value::from(attempts));
        logger.info("search.completed", "Search completed", Some(fields));
    }
}
