//! The readiness gate: single entry point guarding every read.
//!
//! Classifies a request against the snapshot, the runtime fingerprint, and
//! the cloud-side completion proof. Also runs stale-indexing recovery on
//! reader entry.

use crate::deps::AppDeps;
use crate::proof::{ProofOutcome, StaleLocalReason, validate_completion_proof};
use satori_domain::{
    CodebaseEntry, CodebaseStatus, FingerprintSource, IndexFingerprint,
    STALE_INDEXING_RECOVERY_GRACE_MS, WATCHER_DEBOUNCE_MS, canonical_root_string,
};
use satori_shared::{RequestContext, Result};
use serde::Serialize;
use std::path::Path;

/// Operation kinds distinguished by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// `search_codebase`.
    Search,
    /// `file_outline`.
    FileOutline,
    /// `call_graph`.
    CallGraph,
    /// `manage_index` status.
    Status,
    /// `manage_index` sync.
    Sync,
    /// `manage_index` clear.
    Clear,
    /// `manage_index` create.
    Create,
    /// `manage_index` reindex.
    Reindex,
}

impl OperationKind {
    /// True for index-consuming reads.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Search | Self::FileOutline | Self::CallGraph)
    }

    /// True for lifecycle mutations.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Sync | Self::Clear | Self::Create | Self::Reindex)
    }
}

/// Gate classification for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// The operation may proceed.
    Ok,
    /// No usable index exists.
    NotIndexed,
    /// An index is being built.
    NotReady,
    /// The index is incompatible with the runtime fingerprint.
    RequiresReindex,
    /// A write operation is blocked by an in-flight build.
    Blocked,
}

impl GateStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotIndexed => "not_indexed",
            Self::NotReady => "not_ready",
            Self::RequiresReindex => "requires_reindex",
            Self::Blocked => "blocked",
        }
    }

    /// Freshness-decision mode this classification maps to.
    #[must_use]
    pub const fn freshness_mode(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotIndexed => "skipped_not_indexed",
            Self::NotReady | Self::Blocked => "skipped_indexing",
            Self::RequiresReindex => "skipped_requires_reindex",
        }
    }
}

/// Compatibility block attached to every envelope the gate produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compatibility {
    /// The fingerprint this runtime gates against.
    pub runtime_fingerprint: IndexFingerprint,
    /// The fingerprint recorded for the entry, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_fingerprint: Option<IndexFingerprint>,
    /// Provenance of the indexed fingerprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_source: Option<FingerprintSource>,
    /// Recorded reindex reason, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reindex_reason: Option<Box<str>>,
    /// Status observed at check time.
    pub observed_status: Box<str>,
}

/// Proof-probe diagnostics attached when the probe itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugProofCheck {
    /// False when the probe could not complete.
    pub ok: bool,
    /// Why.
    pub reason: Box<str>,
}

/// Actionable hints carried by non-ok decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateHints {
    /// Suggest `manage_index {action: create}`.
    pub create: bool,
    /// Suggest `manage_index {action: reindex}`.
    pub reindex: bool,
    /// Completion-proof stale reason, when that is what failed.
    pub stale_local: Option<StaleLocalReason>,
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    /// Classification.
    pub status: GateStatus,
    /// Status-mirroring reason for non-ok envelopes.
    pub reason: Option<Box<str>>,
    /// Canonical effective root, when one resolved.
    pub effective_root: Option<String>,
    /// Entry observed at the effective root.
    pub entry: Option<CodebaseEntry>,
    /// Retry hint for blocked writes (watcher debounce window).
    pub retry_after_ms: Option<u64>,
    /// Actionable hints.
    pub hints: GateHints,
    /// Compatibility block.
    pub compatibility: Compatibility,
    /// Probe diagnostics when the proof check could not run.
    pub debug_proof_check: Option<DebugProofCheck>,
}

impl GateDecision {
    fn new(status: GateStatus, compatibility: Compatibility) -> Self {
        let reason = match status {
            GateStatus::Ok => None,
            GateStatus::Blocked => Some(Box::from("indexing")),
            other => Some(Box::from(other.as_str())),
        };
        Self {
            status,
            reason,
            effective_root: None,
            entry: None,
            retry_after_ms: None,
            hints: GateHints::default(),
            compatibility,
            debug_proof_check: None,
        }
    }
}

fn compatibility_for(
    runtime_fingerprint: &IndexFingerprint,
    entry: Option<&CodebaseEntry>,
) -> Compatibility {
    Compatibility {
        runtime_fingerprint: runtime_fingerprint.clone(),
        indexed_fingerprint: entry.and_then(|entry| entry.index_fingerprint.clone()),
        fingerprint_source: entry.and_then(|entry| entry.fingerprint_source),
        reindex_reason: entry.and_then(|entry| entry.reindex_reason.clone()),
        observed_status: entry
            .map_or_else(|| Box::from("not_found"), |entry| Box::from(entry.status.as_str())),
    }
}

const fn acceptable(op: OperationKind, status: &CodebaseStatus) -> bool {
    use CodebaseStatus as S;
    match op {
        OperationKind::Status | OperationKind::Create => true,
        OperationKind::Search | OperationKind::FileOutline | OperationKind::CallGraph => matches!(
            status,
            S::Indexed { .. } | S::SyncCompleted { .. } | S::Indexing { .. } | S::IndexFailed { .. }
        ),
        OperationKind::Sync => matches!(
            status,
            S::Indexed { .. } | S::SyncCompleted { .. } | S::Indexing { .. }
        ),
        OperationKind::Clear | OperationKind::Reindex => matches!(
            status,
            S::Indexed { .. }
                | S::SyncCompleted { .. }
                | S::Indexing { .. }
                | S::IndexFailed { .. }
                | S::RequiresReindex { .. }
        ),
    }
}

/// Classify a request. See module docs for the rule order.
pub async fn check_readiness(
    ctx: &RequestContext,
    deps: &AppDeps,
    request_path: &Path,
    op: OperationKind,
) -> Result<GateDecision> {
    ctx.checkpoint("gate.check")?;

    let canonical = canonical_root_string(request_path);
    let ancestors = deps.snapshot.ancestors_of(&canonical).await;

    // (a) blocked-root check: a requires_reindex ancestor poisons everything
    // below it, for every operation except status.
    if op != OperationKind::Status
        && let Some((root, entry)) = ancestors
            .iter()
            .find(|(_, entry)| matches!(entry.status, CodebaseStatus::RequiresReindex { .. }))
    {
        let mut decision = GateDecision::new(
            GateStatus::RequiresReindex,
            compatibility_for(&deps.runtime_fingerprint, Some(entry)),
        );
        decision.effective_root = Some(root.clone());
        decision.entry = Some(entry.clone());
        decision.hints.reindex = true;
        return Ok(decision);
    }

    // Effective root: longest acceptable ancestor, then lexical order.
    let mut candidates: Vec<&(String, CodebaseEntry)> = ancestors
        .iter()
        .filter(|(_, entry)| acceptable(op, &entry.status))
        .collect();
    candidates.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let Some((root, entry)) = candidates.first().map(|(root, entry)| (root.clone(), entry.clone()))
    else {
        let mut decision = GateDecision::new(
            GateStatus::NotIndexed,
            compatibility_for(&deps.runtime_fingerprint, None),
        );
        decision.effective_root = (op == OperationKind::Create).then_some(canonical);
        decision.hints.create = true;
        // `create` against untracked roots proceeds.
        if op == OperationKind::Create || op == OperationKind::Status {
            decision.status = GateStatus::Ok;
            decision.reason = None;
            decision.hints.create = op != OperationKind::Create;
        }
        return Ok(decision);
    };

    let mut entry = entry;

    // Stale-indexing recovery runs on entry to any reader.
    if op.is_read() {
        entry = recover_stale_indexing(ctx, deps, &root, entry).await?;
    }

    // (b) fingerprint compatibility against the runtime fingerprint.
    if op != OperationKind::Status
        && let Some(indexed) = entry.index_fingerprint.clone()
        && !indexed.matches(&deps.runtime_fingerprint)
    {
        deps.snapshot
            .mark_requires_reindex(&root, "fingerprint_mismatch", deps.clock.now_ms())
            .await?;
        let refreshed = deps.snapshot.get(&root).await.unwrap_or(entry);
        let mut decision = GateDecision::new(
            GateStatus::RequiresReindex,
            compatibility_for(&deps.runtime_fingerprint, Some(&refreshed)),
        );
        decision.effective_root = Some(root);
        decision.entry = Some(refreshed);
        decision.hints.reindex = true;
        return Ok(decision);
    }

    // (c) completion-proof validation for reads on ready-claiming entries.
    let mut debug_proof_check = None;
    if op.is_read() && entry.status.claims_ready() {
        match validate_completion_proof(
            ctx,
            deps.context.as_ref(),
            Path::new(&root),
            &deps.runtime_fingerprint,
        )
        .await
        {
            ProofOutcome::Valid(marker) => {
                if entry.index_fingerprint.as_ref() != Some(&marker.fingerprint)
                    || entry.fingerprint_source != Some(FingerprintSource::Verified)
                {
                    deps.snapshot
                        .set_fingerprint(
                            &root,
                            marker.fingerprint.clone(),
                            FingerprintSource::Verified,
                            deps.clock.now_ms(),
                        )
                        .await?;
                    entry.index_fingerprint = Some(marker.fingerprint);
                    entry.fingerprint_source = Some(FingerprintSource::Verified);
                }
            },
            ProofOutcome::StaleLocal(reason) => {
                let mut decision = GateDecision::new(
                    GateStatus::NotIndexed,
                    compatibility_for(&deps.runtime_fingerprint, Some(&entry)),
                );
                decision.effective_root = Some(root);
                decision.entry = Some(entry);
                decision.hints.create = true;
                decision.hints.stale_local = Some(reason);
                return Ok(decision);
            },
            ProofOutcome::FingerprintMismatch { indexed } => {
                let now = deps.clock.now_ms();
                deps.snapshot
                    .mark_requires_reindex(&root, "completion_proof_fingerprint_mismatch", now)
                    .await?;
                deps.snapshot
                    .set_fingerprint(&root, indexed, FingerprintSource::Verified, now)
                    .await?;
                let refreshed = deps.snapshot.get(&root).await.unwrap_or(entry);
                let mut decision = GateDecision::new(
                    GateStatus::RequiresReindex,
                    compatibility_for(&deps.runtime_fingerprint, Some(&refreshed)),
                );
                decision.effective_root = Some(root);
                decision.entry = Some(refreshed);
                decision.hints.reindex = true;
                return Ok(decision);
            },
            ProofOutcome::ProbeFailed => {
                debug_proof_check = Some(DebugProofCheck {
                    ok: false,
                    reason: "probe_failed".into(),
                });
            },
        }
    }

    // (d) operation-specific rules.
    let status = match (&entry.status, op) {
        (CodebaseStatus::Indexing { .. }, op) if op.is_write() => GateStatus::Blocked,
        (CodebaseStatus::Indexing { .. }, op) if op.is_read() => GateStatus::NotReady,
        (CodebaseStatus::IndexFailed { .. } | CodebaseStatus::NotFound, OperationKind::Create) => {
            GateStatus::Ok
        },
        (CodebaseStatus::IndexFailed { .. } | CodebaseStatus::NotFound, op)
            if op != OperationKind::Status =>
        {
            GateStatus::NotIndexed
        },
        _ => GateStatus::Ok,
    };

    let mut decision = GateDecision::new(
        status,
        compatibility_for(&deps.runtime_fingerprint, Some(&entry)),
    );
    decision.effective_root = Some(root);
    decision.entry = Some(entry);
    decision.debug_proof_check = debug_proof_check;
    if status == GateStatus::Blocked {
        decision.retry_after_ms = Some(WATCHER_DEBOUNCE_MS);
    }
    if status == GateStatus::NotIndexed {
        decision.hints.create = true;
    }
    Ok(decision)
}

/// Promote or fail an `indexing` entry that outlived the recovery grace.
async fn recover_stale_indexing(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
    entry: CodebaseEntry,
) -> Result<CodebaseEntry> {
    let CodebaseStatus::Indexing { .. } = entry.status else {
        return Ok(entry);
    };

    let now = deps.clock.now_ms();
    let stalled_for = now.saturating_sub(entry.last_updated_ms);
    if stalled_for <= STALE_INDEXING_RECOVERY_GRACE_MS {
        return Ok(entry);
    }

    match validate_completion_proof(
        ctx,
        deps.context.as_ref(),
        Path::new(root),
        &deps.runtime_fingerprint,
    )
    .await
    {
        ProofOutcome::Valid(marker) => {
            deps.snapshot
                .set_status(
                    root,
                    CodebaseStatus::Indexed {
                        indexed_files: marker.indexed_files,
                        total_chunks: marker.total_chunks,
                    },
                    now,
                )
                .await?;
            deps.snapshot
                .set_fingerprint(root, marker.fingerprint, FingerprintSource::Verified, now)
                .await?;
        },
        ProofOutcome::StaleLocal(_)
        | ProofOutcome::FingerprintMismatch { .. }
        | ProofOutcome::ProbeFailed => {
            let minutes = stalled_for / 60_000;
            deps.snapshot
                .set_status(
                    root,
                    CodebaseStatus::IndexFailed {
                        error_message: format!(
                            "Indexing stalled for {minutes}m without completion proof."
                        )
                        .into_boxed_str(),
                        last_attempted_percentage: indexing_percentage(&entry.status),
                    },
                    now,
                )
                .await?;
        },
    }

    Ok(deps.snapshot.get(root).await.unwrap_or(entry))
}

const fn indexing_percentage(status: &CodebaseStatus) -> Option<f64> {
    match status {
        CodebaseStatus::Indexing {
            indexing_percentage,
        } => Some(*indexing_percentage),
        _ => None,
    }
}
