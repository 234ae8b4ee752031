//! Indexing lifecycle: create, reindex, sync, clear, status, plus the
//! non-destructive cloud reconcile.

use crate::deps::AppDeps;
use crate::proof::{ProofOutcome, validate_completion_proof};
use crate::search::FreshnessDecision;
use satori_domain::{
    CodebaseEntry, CodebaseStatus, CompletionMarker, FingerprintSource, WATCHER_DEBOUNCE_MS,
    canonical_root_string,
};
use satori_ports::{CollectionDetails, LogFields};
use satori_shared::{RequestContext, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

/// `manage_index` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageAction {
    /// Build a fresh index.
    Create,
    /// Drop and rebuild.
    Reindex,
    /// Apply an incremental delta.
    Sync,
    /// Drop everything for the codebase.
    Clear,
    /// Report the tracked state.
    Status,
}

impl ManageAction {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Reindex => "reindex",
            Self::Sync => "sync",
            Self::Clear => "clear",
            Self::Status => "status",
        }
    }
}

/// `manage_index` request after argument validation.
#[derive(Debug, Clone)]
pub struct ManageRequest {
    /// Action to perform.
    pub action: ManageAction,
    /// Target codebase path.
    pub path: PathBuf,
    /// Force a rebuild even when already indexed.
    pub force: bool,
    /// Explicit collection to drop before reindexing.
    pub zilliz_drop_collection: Option<String>,
    /// Extra file extensions to index.
    pub custom_extensions: Vec<Box<str>>,
    /// Extra ignore patterns.
    pub ignore_patterns: Vec<Box<str>>,
}

/// Outcome envelope for `manage_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct ManageOutcome {
    /// Stable outcome mode (`created`, `synced`, `blocked`, ...).
    pub mode: Box<str>,
    /// Human-readable outcome text.
    pub message: String,
    /// Freshness decision (sync only).
    pub freshness_decision: Option<FreshnessDecision>,
    /// Actionable hints (retry commands and the like).
    pub hints: BTreeMap<Box<str>, Value>,
    /// Entry after the action, when one exists.
    pub entry: Option<CodebaseEntry>,
    /// Canonical root the action applied to.
    pub root: String,
    /// Retry hint for blocked outcomes.
    pub retry_after_ms: Option<u64>,
}

impl ManageOutcome {
    fn new(mode: &str, root: String, message: String) -> Self {
        Self {
            mode: mode.into(),
            message,
            freshness_decision: None,
            hints: BTreeMap::new(),
            entry: None,
            root,
            retry_after_ms: None,
        }
    }

    fn blocked_by_indexing(root: String) -> Self {
        let mut outcome = Self::new(
            "blocked",
            root,
            "An index build is in flight; retry after the debounce window.".to_owned(),
        );
        outcome.retry_after_ms = Some(WATCHER_DEBOUNCE_MS);
        outcome
            .hints
            .insert("reason".into(), Value::from("indexing"));
        outcome
    }
}

/// Per-root sync coalescing: a second concurrent sync observes the in-flight
/// decision instead of racing the delta.
#[derive(Debug, Default)]
pub struct SyncGuard {
    in_flight: StdMutex<BTreeSet<String>>,
}

impl SyncGuard {
    /// Try to claim the root; false when a sync is already running.
    pub fn begin(&self, root: &str) -> bool {
        self.in_flight
            .lock()
            .map(|mut guard| guard.insert(root.to_owned()))
            .unwrap_or(false)
    }

    /// Release the root.
    pub fn end(&self, root: &str) {
        if let Ok(mut guard) = self.in_flight.lock() {
            guard.remove(root);
        }
    }
}

/// Dispatch a `manage_index` request.
pub async fn handle_manage_index(
    ctx: &RequestContext,
    deps: &AppDeps,
    request: ManageRequest,
) -> Result<ManageOutcome> {
    ctx.checkpoint("manage_index.start")?;
    let root = canonical_root_string(&request.path);

    match request.action {
        ManageAction::Create => create_index(ctx, deps, &root, &request, false).await,
        ManageAction::Reindex => reindex(ctx, deps, &root, &request).await,
        ManageAction::Sync => sync(ctx, deps, &root, &request).await,
        ManageAction::Clear => clear(ctx, deps, &root).await,
        ManageAction::Status => status(deps, &root).await,
    }
}

async fn create_index(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
    request: &ManageRequest,
    rebuilding: bool,
) -> Result<ManageOutcome> {
    let existing = deps.snapshot.get(root).await;

    if let Some(entry) = existing.as_ref() {
        if matches!(entry.status, CodebaseStatus::Indexing { .. }) {
            return Ok(ManageOutcome::blocked_by_indexing(root.to_owned()));
        }
        if entry.status.is_searchable() && !request.force && !rebuilding {
            let mut outcome = ManageOutcome::new(
                "already_indexed",
                root.to_owned(),
                format!("{root} is already indexed; pass force to rebuild."),
            );
            outcome.hints.insert(
                "reindex".into(),
                manage_args_hint("reindex", root, None),
            );
            outcome.entry = Some(entry.clone());
            return Ok(outcome);
        }
    }

    // Creating a brand-new collection may hit the backend limit; surface the
    // guidance payload before touching any state.
    let collection = deps
        .context
        .resolve_collection_name(ctx, Path::new(root))
        .await?;
    let collection_exists = deps.store.has_collection(ctx, collection).await?;
    if !collection_exists {
        let limit = deps.store.check_collection_limit(ctx).await?;
        if !limit.can_create {
            return collection_limit_outcome(ctx, deps, root).await;
        }
    }

    let now = deps.clock.now_ms();
    deps.snapshot
        .mutate(root, now, |entry| {
            entry.status = CodebaseStatus::Indexing {
                indexing_percentage: 0.0,
            };
            entry.reindex_reason = None;
        })
        .await?;
    deps.context
        .clear_index_completion_marker(ctx, Path::new(root))
        .await?;

    let progress = std::sync::Arc::new(StdMutex::new(0.0f64));
    let progress_sink = std::sync::Arc::clone(&progress);
    let on_progress: Box<satori_ports::ProgressFn> = Box::new(move |percentage| {
        if let Ok(mut guard) = progress_sink.lock() {
            *guard = percentage;
        }
    });

    let built = deps
        .context
        .index_codebase(
            ctx,
            Path::new(root),
            request.custom_extensions.clone(),
            request.ignore_patterns.clone(),
            Some(on_progress),
        )
        .await;

    match built {
        Ok(outcome_stats) => {
            let completed_at = deps.clock.now_utc();
            let marker = CompletionMarker::for_run(
                root,
                deps.runtime_fingerprint.clone(),
                outcome_stats.indexed_files,
                outcome_stats.total_chunks,
                completed_at,
            );
            deps.context
                .write_index_completion_marker(ctx, Path::new(root), marker)
                .await?;

            let manifest = deps
                .context
                .get_tracked_relative_paths(ctx, Path::new(root))
                .await
                .ok()
                .map(|paths| paths.into_iter().collect::<BTreeSet<Box<str>>>());

            let now = deps.clock.now_ms();
            let fingerprint = deps.runtime_fingerprint.clone();
            deps.snapshot
                .mutate(root, now, |entry| {
                    entry.status = CodebaseStatus::Indexed {
                        indexed_files: outcome_stats.indexed_files,
                        total_chunks: outcome_stats.total_chunks,
                    };
                    entry.index_fingerprint = Some(fingerprint.clone());
                    entry.fingerprint_source = Some(FingerprintSource::Verified);
                    entry.reindex_reason = None;
                    if let Some(manifest) = manifest.clone() {
                        entry.index_manifest = Some(manifest);
                    }
                    // A sidecar built under another fingerprint is unusable.
                    if entry
                        .call_graph_sidecar
                        .as_ref()
                        .is_some_and(|sidecar| !sidecar.fingerprint.matches(&fingerprint))
                    {
                        entry.call_graph_sidecar = None;
                    }
                })
                .await?;

            log_lifecycle(deps, "index.completed", root, outcome_stats.indexed_files);

            let mode = if rebuilding { "reindexed" } else { "created" };
            let mut outcome = ManageOutcome::new(
                mode,
                root.to_owned(),
                format!(
                    "Indexed {} files into {} chunks.",
                    outcome_stats.indexed_files, outcome_stats.total_chunks
                ),
            );
            outcome.entry = deps.snapshot.get(root).await;
            Ok(outcome)
        },
        Err(error) => {
            deps.context
                .clear_index_completion_marker(ctx, Path::new(root))
                .await?;

            let last_attempted = progress.lock().map(|guard| *guard).unwrap_or(0.0);
            let now = deps.clock.now_ms();
            deps.snapshot
                .set_status(
                    root,
                    CodebaseStatus::IndexFailed {
                        error_message: error.message.clone().into_boxed_str(),
                        last_attempted_percentage: Some(last_attempted),
                    },
                    now,
                )
                .await?;

            log_lifecycle(deps, "index.failed", root, 0);

            let mut outcome = ManageOutcome::new(
                "failed",
                root.to_owned(),
                format!("Indexing failed: {}", error.message),
            );
            outcome
                .hints
                .insert("retry".into(), manage_args_hint("create", root, None));
            outcome.entry = deps.snapshot.get(root).await;
            Ok(outcome)
        },
    }
}

async fn reindex(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
    request: &ManageRequest,
) -> Result<ManageOutcome> {
    if let Some(entry) = deps.snapshot.get(root).await
        && matches!(entry.status, CodebaseStatus::Indexing { .. })
    {
        return Ok(ManageOutcome::blocked_by_indexing(root.to_owned()));
    }

    // Force path: drop matching collections and all local state, then build
    // from scratch.
    if let Some(name) = request.zilliz_drop_collection.as_deref() {
        let collection = satori_domain::CollectionName::parse(name)?;
        deps.store.drop_collection(ctx, collection).await?;
    } else {
        let collection = deps
            .context
            .resolve_collection_name(ctx, Path::new(root))
            .await?;
        if deps.store.has_collection(ctx, collection.clone()).await? {
            deps.store.drop_collection(ctx, collection).await?;
        }
    }

    deps.context.clear_index(ctx, Path::new(root)).await?;
    deps.context
        .clear_index_completion_marker(ctx, Path::new(root))
        .await?;
    deps.snapshot.remove(root).await?;

    create_index(ctx, deps, root, request, true).await
}

async fn sync(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
    request: &ManageRequest,
) -> Result<ManageOutcome> {
    let entry = deps.snapshot.get(root).await;

    let skip_mode = match entry.as_ref().map(|entry| &entry.status) {
        Some(CodebaseStatus::RequiresReindex { .. }) => Some("skipped_requires_reindex"),
        Some(CodebaseStatus::Indexing { .. }) => {
            return Ok(ManageOutcome::blocked_by_indexing(root.to_owned()));
        },
        Some(CodebaseStatus::IndexFailed { .. } | CodebaseStatus::NotFound) | None => {
            Some("skipped_not_indexed")
        },
        Some(CodebaseStatus::Indexed { .. } | CodebaseStatus::SyncCompleted { .. }) => None,
    };
    if let Some(mode) = skip_mode {
        let mut outcome = ManageOutcome::new(
            "sync_skipped",
            root.to_owned(),
            format!("Sync skipped: {mode}."),
        );
        outcome.freshness_decision = Some(FreshnessDecision::of(mode));
        outcome
            .hints
            .insert("create".into(), manage_args_hint("create", root, None));
        outcome.entry = entry;
        return Ok(outcome);
    }

    // Concurrent syncs coalesce onto the in-flight one.
    if !deps.sync_guard.begin(root) {
        let mut outcome = ManageOutcome::new(
            "sync_coalesced",
            root.to_owned(),
            "A sync for this codebase is already in flight.".to_owned(),
        );
        outcome.freshness_decision = Some(FreshnessDecision::of("coalesced"));
        return Ok(outcome);
    }

    let result = run_sync(ctx, deps, root, request).await;
    deps.sync_guard.end(root);
    result
}

async fn run_sync(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
    request: &ManageRequest,
) -> Result<ManageOutcome> {
    // Ignore-rule reconciliation never silently succeeds.
    let active_patterns = match deps
        .context
        .get_active_ignore_patterns(ctx, Path::new(root))
        .await
    {
        Ok(patterns) => patterns,
        Err(error) => {
            let mut outcome = ManageOutcome::new(
                "sync_ignore_reload_failed",
                root.to_owned(),
                format!("Sync aborted: ignore rules could not be reloaded ({}).", error.message),
            );
            outcome.freshness_decision = Some(FreshnessDecision::of("ignore_reload_failed"));
            return Ok(outcome);
        },
    };

    let ignore_changed = !request.ignore_patterns.is_empty()
        && request.ignore_patterns.iter().collect::<BTreeSet<_>>()
            != active_patterns.iter().collect::<BTreeSet<_>>();

    let delta = deps.context.reindex_by_change(ctx, Path::new(root)).await?;

    let manifest = deps
        .context
        .get_tracked_relative_paths(ctx, Path::new(root))
        .await
        .ok()
        .map(|paths| paths.into_iter().collect::<BTreeSet<Box<str>>>());

    let now = deps.clock.now_ms();
    deps.snapshot
        .mutate(root, now, |entry| {
            entry.status = CodebaseStatus::SyncCompleted {
                added: delta.added,
                removed: delta.removed,
                modified: delta.modified,
            };
            if let Some(manifest) = manifest.clone() {
                entry.index_manifest = Some(manifest);
            }
        })
        .await?;

    log_lifecycle(deps, "sync.completed", root, delta.total());

    let mode = if ignore_changed {
        "reconciled_ignore_change"
    } else {
        "ok"
    };
    let mut outcome = ManageOutcome::new(
        "synced",
        root.to_owned(),
        format!(
            "Synced: +{} -{} ~{} files.",
            delta.added, delta.removed, delta.modified
        ),
    );
    outcome.freshness_decision = Some(FreshnessDecision::of(mode));
    outcome.entry = deps.snapshot.get(root).await;
    Ok(outcome)
}

async fn clear(ctx: &RequestContext, deps: &AppDeps, root: &str) -> Result<ManageOutcome> {
    if let Some(entry) = deps.snapshot.get(root).await
        && matches!(entry.status, CodebaseStatus::Indexing { .. })
    {
        return Ok(ManageOutcome::blocked_by_indexing(root.to_owned()));
    }

    deps.context.clear_index(ctx, Path::new(root)).await?;
    deps.context
        .clear_index_completion_marker(ctx, Path::new(root))
        .await?;
    deps.snapshot.remove(root).await?;

    log_lifecycle(deps, "index.cleared", root, 0);

    Ok(ManageOutcome::new(
        "cleared",
        root.to_owned(),
        format!("Cleared all index data for {root}."),
    ))
}

async fn status(deps: &AppDeps, root: &str) -> Result<ManageOutcome> {
    let entry = deps.snapshot.get(root).await;
    let message = entry.as_ref().map_or_else(
        || format!("{root} is not tracked."),
        |entry| format!("{root}: {}", entry.status.as_str()),
    );

    let mut outcome = ManageOutcome::new("status", root.to_owned(), message);
    if entry.is_none() {
        outcome
            .hints
            .insert("create".into(), manage_args_hint("create", root, None));
    }
    outcome.entry = entry;
    Ok(outcome)
}

/// Collection-limit guidance: existing collections oldest to newest with
/// `[oldest|newest|target]` labels and an exact retry command.
async fn collection_limit_outcome(
    ctx: &RequestContext,
    deps: &AppDeps,
    root: &str,
) -> Result<ManageOutcome> {
    let mut details = deps.store.list_collection_details(ctx).await?;
    details.sort_by(|a, b| {
        a.created_at_ms
            .cmp(&b.created_at_ms)
            .then_with(|| a.name.cmp(&b.name))
    });

    let last = details.len().saturating_sub(1);
    let lines: Vec<String> = details
        .iter()
        .enumerate()
        .map(|(index, detail)| {
            let mut labels = Vec::new();
            if index == 0 {
                labels.push("oldest");
            }
            if index == last && !details.is_empty() {
                labels.push("newest");
            }
            if is_target(detail, root) {
                labels.push("target");
            }
            let labels = if labels.is_empty() {
                String::new()
            } else {
                format!(" [{}]", labels.join("|"))
            };
            format!(
                "- {}{labels} ({})",
                detail.name,
                detail.codebase_path.as_deref().unwrap_or("unknown path")
            )
        })
        .collect();

    let drop_candidate = details
        .first()
        .map(|detail| detail.name.as_str().to_owned());

    let mut outcome = ManageOutcome::new(
        "collection_limit",
        root.to_owned(),
        format!(
            "The vector store collection limit is reached. Existing collections (oldest first):\n{}",
            lines.join("\n")
        ),
    );
    outcome.hints.insert(
        "retry".into(),
        manage_args_hint("reindex", root, drop_candidate.as_deref()),
    );
    Ok(outcome)
}

fn is_target(detail: &CollectionDetails, root: &str) -> bool {
    detail
        .codebase_path
        .as_deref()
        .is_some_and(|path| canonical_root_string(Path::new(path)) == root)
}

fn manage_args_hint(action: &str, root: &str, drop_collection: Option<&str>) -> Value {
    let mut args = serde_json::Map::new();
    args.insert("action".to_owned(), Value::from(action));
    args.insert("path".to_owned(), Value::from(root));
    if let Some(name) = drop_collection {
        args.insert("zillizDropCollection".to_owned(), Value::from(name));
    }
    serde_json::json!({ "args": Value::Object(args) })
}

/// Summary of a non-destructive cloud reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Remote collections scanned.
    pub scanned: usize,
    /// Local roots repaired from valid markers.
    pub repaired: Vec<String>,
}

/// Walk remote collections and repair local entries from valid markers.
///
/// Entries currently `indexing` are left alone, ready entries are left
/// alone, and nothing is ever removed.
pub async fn reconcile_cloud(ctx: &RequestContext, deps: &AppDeps) -> Result<ReconcileSummary> {
    let details = deps.store.list_collection_details(ctx).await?;
    let scanned = details.len();
    let mut repaired = Vec::new();

    for detail in details {
        let Some(codebase_path) = detail.codebase_path.as_deref() else {
            continue;
        };
        let root = canonical_root_string(Path::new(codebase_path));

        let local = deps.snapshot.get(&root).await;
        let skip = local.as_ref().is_some_and(|entry| {
            matches!(entry.status, CodebaseStatus::Indexing { .. }) || entry.status.claims_ready()
        });
        if skip {
            continue;
        }

        let outcome = validate_completion_proof(
            ctx,
            deps.context.as_ref(),
            Path::new(&root),
            &deps.runtime_fingerprint,
        )
        .await;
        let ProofOutcome::Valid(marker) = outcome else {
            continue;
        };

        let now = deps.clock.now_ms();
        deps.snapshot
            .mutate(&root, now, |entry| {
                entry.status = CodebaseStatus::Indexed {
                    indexed_files: marker.indexed_files,
                    total_chunks: marker.total_chunks,
                };
                entry.index_fingerprint = Some(marker.fingerprint.clone());
                entry.fingerprint_source = Some(FingerprintSource::Verified);
                entry.reindex_reason = None;
            })
            .await?;
        repaired.push(root);
    }

    Ok(ReconcileSummary { scanned, repaired })
}

/// All tracked entries, ordered by canonical root (for the list formatter).
pub async fn list_codebases(deps: &AppDeps) -> Vec<(String, CodebaseEntry)> {
    deps.snapshot.entries().await
}

fn log_lifecycle(deps: &AppDeps, event: &str, root: &str, count: u64) {
    if let Some(logger) = deps.logger.as_ref() {
        let mut fields = LogFields::new();
        fields.insert("codebaseRoot".into(), Value::String(root.to_owned()));
        fields.insert("count".into(), Value::from(count));
        logger.info(event, "Lifecycle event", Some(fields));
    }
}
