//! In-memory adapter implementations for port contracts.
//!
//! These implementations are deterministic: the embedding engine scores by
//! token overlap, the reranker follows a script, and every collaborator can
//! be told to fail to exercise degradation paths.

use satori_domain::{ChunkHit, CollectionName, CompletionMarker, canonical_root_string};
use satori_ports::{
    BackendInfo, BoxFuture, ChangedFiles, CollectionDetails, CollectionLimit, ContextPort,
    EmbeddingPort, EmbeddingProviderInfo, IndexOutcome, LogEvent, LoggerPort, ProgressFn,
    RerankOptions, RerankedEntry, RerankerPort, StoreRow, SyncDelta, VcsPort, VectorStorePort,
};
use satori_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex as StdMutex;
use tokio::sync::RwLock;

fn transport_error(message: &str) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(ErrorCode::transport(), message, ErrorClass::Retriable)
}

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}
}

/// A logger that records every event for assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: StdMutex<Vec<LogEvent>>,
}

impl RecordingLogger {
    /// Drain recorded events.
    pub fn take_events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, event: LogEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

/// Deterministic in-memory embedding engine.
///
/// `semantic_search` scores corpus chunks by token overlap with the query;
/// queries containing a configured failure needle return a transport error
/// (used to exercise pass-degradation paths).
pub struct InMemoryEmbedding {
    provider: EmbeddingProviderInfo,
    dimension: u32,
    corpus: Vec<ChunkHit>,
    fail_needle: Option<Box<str>>,
}

impl InMemoryEmbedding {
    /// Create an engine over a fixed corpus.
    #[must_use]
    pub fn new(corpus: Vec<ChunkHit>) -> Self {
        Self {
            provider: EmbeddingProviderInfo {
                id: "voyageai".into(),
                model: "voyage-4-large".into(),
            },
            dimension: 1024,
            corpus,
            fail_needle: None,
        }
    }

    /// Fail any pass whose query contains `needle`.
    #[must_use]
    pub fn with_failure_needle(mut self, needle: impl Into<Box<str>>) -> Self {
        self.fail_needle = Some(needle.into());
        self
    }

    fn score(query_tokens: &[String], hit: &ChunkHit) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }

        let haystack = format!(
            "{} {} {}",
            hit.relative_path,
            hit.symbol_label.as_deref().unwrap_or(""),
            hit.content
        )
        .to_ascii_lowercase();
        let matched = query_tokens
            .iter()
            .filter(|token| haystack.contains(token.as_str()))
            .count();

        #[allow(clippy::cast_precision_loss, reason = "token counts are tiny")]
        let ratio = matched as f32 / query_tokens.len() as f32;
        ratio
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_ascii_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

impl EmbeddingPort for InMemoryEmbedding {
    fn provider(&self) -> &EmbeddingProviderInfo {
        &self.provider
    }

    fn dimension(&self) -> u32 {
        self.dimension
    }

    fn semantic_search(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
        query: Box<str>,
        limit: u32,
        floor: f32,
    ) -> BoxFuture<'_, Result<Vec<ChunkHit>>> {
        let fail = self
            .fail_needle
            .as_deref()
            .is_some_and(|needle| query.contains(needle));

        Box::pin(async move {
            if fail {
                return Err(transport_error("semantic pass failed"));
            }

            let tokens = tokenize(&query);
            let mut hits: Vec<ChunkHit> = self
                .corpus
                .iter()
                .map(|chunk| {
                    let mut hit = chunk.clone();
                    hit.score = Self::score(&tokens, chunk);
                    hit
                })
                .filter(|hit| hit.score >= floor)
                .collect();

            hits.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| a.relative_path.cmp(&b.relative_path))
                    .then_with(|| a.span.start_line().cmp(&b.span.start_line()))
            });
            hits.truncate(limit as usize);
            Ok(hits)
        })
    }
}

/// Scripted reranker behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankScript {
    /// Return the documents in their submitted order.
    Identity,
    /// Return the documents reversed.
    Reversed,
    /// Fail the API call.
    FailApiCall,
    /// Return an out-of-range document index (parse failure downstream).
    InvalidIndexes,
}

/// Scripted reranker.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedReranker {
    script: RerankScript,
}

impl ScriptedReranker {
    /// Create a reranker with the given script.
    #[must_use]
    pub const fn new(script: RerankScript) -> Self {
        Self { script }
    }
}

impl RerankerPort for ScriptedReranker {
    fn rerank(
        &self,
        _ctx: &RequestContext,
        _query: Box<str>,
        documents: Vec<Box<str>>,
        options: RerankOptions,
    ) -> BoxFuture<'_, Result<Vec<RerankedEntry>>> {
        let script = self.script;
        Box::pin(async move {
            match script {
                RerankScript::FailApiCall => Err(transport_error("reranker unavailable")),
                RerankScript::Identity => Ok((0..documents.len().min(options.top_k))
                    .map(|index| RerankedEntry {
                        document_index: index,
                        relevance_score: 1.0 - index as f64 / 100.0,
                    })
                    .collect()),
                RerankScript::Reversed => Ok((0..documents.len().min(options.top_k))
                    .rev()
                    .map(|index| RerankedEntry {
                        document_index: index,
                        relevance_score: 1.0 - index as f64 / 100.0,
                    })
                    .collect()),
                RerankScript::InvalidIndexes => Ok(vec![RerankedEntry {
                    document_index: documents.len() + 7,
                    relevance_score: 1.0,
                }]),
            }
        })
    }
}

/// Static VCS with a fixed dirty set.
#[derive(Debug, Default)]
pub struct StaticVcs {
    files: Vec<Box<str>>,
    fail: bool,
}

impl StaticVcs {
    /// A VCS reporting the given dirty files.
    #[must_use]
    pub fn with_changed(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(|file| Box::from(*file)).collect(),
            fail: false,
        }
    }

    /// A VCS whose probes fail.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
        }
    }
}

impl VcsPort for StaticVcs {
    fn changed_files(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
    ) -> BoxFuture<'_, Result<ChangedFiles>> {
        let fail = self.fail;
        let files = self.files.clone();
        Box::pin(async move {
            if fail {
                return Err(transport_error("vcs status failed"));
            }
            Ok(ChangedFiles { files })
        })
    }
}

/// One collection tracked by the in-memory store.
#[derive(Debug, Clone)]
struct StoredCollection {
    codebase_path: Option<Box<str>>,
    created_at_ms: u64,
}

/// In-memory vector store.
pub struct InMemoryVectorStore {
    collections: RwLock<BTreeMap<String, StoredCollection>>,
    limit: Option<u32>,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl InMemoryVectorStore {
    /// Create a store with an optional collection limit.
    #[must_use]
    pub const fn new(limit: Option<u32>) -> Self {
        Self {
            collections: RwLock::const_new(BTreeMap::new()),
            limit,
        }
    }

    /// Register a collection (as an external indexer would).
    pub async fn add_collection(
        &self,
        name: &CollectionName,
        codebase_path: Option<&str>,
        created_at_ms: u64,
    ) {
        let mut collections = self.collections.write().await;
        collections.insert(
            name.as_str().to_owned(),
            StoredCollection {
                codebase_path: codebase_path.map(Box::from),
                created_at_ms,
            },
        );
    }
}

impl VectorStorePort for InMemoryVectorStore {
    fn list_collections(
        &self,
        _ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<CollectionName>>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            collections
                .keys()
                .map(|name| CollectionName::parse(name).map_err(Into::into))
                .collect()
        })
    }

    fn list_collection_details(
        &self,
        _ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<CollectionDetails>>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            collections
                .iter()
                .map(|(name, stored)| {
                    Ok(CollectionDetails {
                        name: CollectionName::parse(name)?,
                        codebase_path: stored.codebase_path.clone(),
                        created_at_ms: Some(stored.created_at_ms),
                    })
                })
                .collect()
        })
    }

    fn has_collection(
        &self,
        _ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            Ok(collections.contains_key(collection_name.as_str()))
        })
    }

    fn drop_collection(
        &self,
        _ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            collections.remove(collection_name.as_str());
            Ok(())
        })
    }

    fn query(
        &self,
        _ctx: &RequestContext,
        _collection_name: CollectionName,
        _filter: Box<str>,
        _projection: Vec<Box<str>>,
        _limit: Option<u32>,
    ) -> BoxFuture<'_, Result<Vec<StoreRow>>> {
        Box::pin(async move { Ok(Vec::new()) })
    }

    fn check_collection_limit(
        &self,
        _ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<CollectionLimit>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            let existing = u32::try_from(collections.len()).unwrap_or(u32::MAX);
            let can_create = self.limit.is_none_or(|limit| existing < limit);
            Ok(CollectionLimit {
                can_create,
                limit: self.limit,
                existing,
            })
        })
    }

    fn backend_info(&self, _ctx: &RequestContext) -> BoxFuture<'_, Result<BackendInfo>> {
        Box::pin(async move {
            Ok(BackendInfo {
                provider: "zilliz".into(),
                description: "in-memory test store".into(),
            })
        })
    }
}

/// Scripted outcomes for the in-memory indexing context.
#[derive(Debug, Clone)]
pub struct ContextScript {
    /// Outcome of `index_codebase`.
    pub index_outcome: Result<IndexOutcome>,
    /// Outcome of `reindex_by_change`.
    pub sync_delta: Result<SyncDelta>,
    /// Tracked relative paths.
    pub tracked_paths: Vec<Box<str>>,
    /// Active ignore patterns (`Err` exercises ignore reload failures).
    pub ignore_patterns: Result<Vec<Box<str>>>,
    /// Fail marker probes with a transport error.
    pub fail_marker_probe: bool,
}

impl Default for ContextScript {
    fn default() -> Self {
        Self {
            index_outcome: Ok(IndexOutcome {
                indexed_files: 10,
                total_chunks: 100,
            }),
            sync_delta: Ok(SyncDelta {
                added: 1,
                removed: 0,
                modified: 2,
            }),
            tracked_paths: Vec::new(),
            ignore_patterns: Ok(Vec::new()),
            fail_marker_probe: false,
        }
    }
}

/// In-memory indexing context with a marker document store.
pub struct InMemoryContext {
    script: StdMutex<ContextScript>,
    markers: RwLock<BTreeMap<String, Value>>,
}

impl Default for InMemoryContext {
    fn default() -> Self {
        Self::new(ContextScript::default())
    }
}

impl InMemoryContext {
    /// Create a context with scripted outcomes.
    #[must_use]
    pub fn new(script: ContextScript) -> Self {
        Self {
            script: StdMutex::new(script),
            markers: RwLock::const_new(BTreeMap::new()),
        }
    }

    /// Seed a raw marker document (possibly malformed).
    pub async fn seed_marker(&self, root: &Path, raw: Value) {
        let mut markers = self.markers.write().await;
        markers.insert(canonical_root_string(root), raw);
    }

    /// Update the script mid-test.
    pub fn set_script(&self, script: ContextScript) {
        if let Ok(mut guard) = self.script.lock() {
            *guard = script;
        }
    }

    fn script(&self) -> ContextScript {
        self.script
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ContextPort for InMemoryContext {
    fn resolve_collection_name(
        &self,
        _ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<CollectionName>> {
        let canonical = canonical_root_string(root);
        Box::pin(async move {
            satori_domain::derive_collection_name(&canonical).map_err(Into::into)
        })
    }

    fn index_codebase(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
        _custom_extensions: Vec<Box<str>>,
        _ignore_patterns: Vec<Box<str>>,
        on_progress: Option<Box<ProgressFn>>,
    ) -> BoxFuture<'_, Result<IndexOutcome>> {
        let outcome = self.script().index_outcome;
        Box::pin(async move {
            if let Some(progress) = on_progress.as_ref() {
                progress(50.0);
                progress(100.0);
            }
            outcome
        })
    }

    fn reindex_by_change(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
    ) -> BoxFuture<'_, Result<SyncDelta>> {
        let delta = self.script().sync_delta;
        Box::pin(async move { delta })
    }

    fn clear_index(&self, _ctx: &RequestContext, root: &Path) -> BoxFuture<'_, Result<()>> {
        let canonical = canonical_root_string(root);
        Box::pin(async move {
            let mut markers = self.markers.write().await;
            markers.remove(&canonical);
            Ok(())
        })
    }

    fn get_index_completion_marker(
        &self,
        _ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<Option<Value>>> {
        let fail = self.script().fail_marker_probe;
        let canonical = canonical_root_string(root);
        Box::pin(async move {
            if fail {
                return Err(transport_error("marker probe failed"));
            }
            let markers = self.markers.read().await;
            Ok(markers.get(&canonical).cloned())
        })
    }

    fn write_index_completion_marker(
        &self,
        _ctx: &RequestContext,
        root: &Path,
        marker: CompletionMarker,
    ) -> BoxFuture<'_, Result<()>> {
        let canonical = canonical_root_string(root);
        Box::pin(async move {
            let raw = serde_json::to_value(&marker)?;
            let mut markers = self.markers.write().await;
            markers.insert(canonical, raw);
            Ok(())
        })
    }

    fn clear_index_completion_marker(
        &self,
        _ctx: &RequestContext,
        root: &Path,
    ) -> BoxFuture<'_, Result<()>> {
        let canonical = canonical_root_string(root);
        Box::pin(async move {
            let mut markers = self.markers.write().await;
            markers.remove(&canonical);
            Ok(())
        })
    }

    fn get_active_ignore_patterns(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let patterns = self.script().ignore_patterns;
        Box::pin(async move { patterns })
    }

    fn get_tracked_relative_paths(
        &self,
        _ctx: &RequestContext,
        _root: &Path,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let tracked = self.script().tracked_paths;
        Box::pin(async move { Ok(tracked) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::LineSpan;

    fn hit(path: &str, content: &str) -> ChunkHit {
        ChunkHit {
            relative_path: path.into(),
            span: LineSpan::new(1, 5).unwrap_or_else(|_| unreachable!()),
            language: None,
            content: content.into(),
            symbol_id: None,
            symbol_label: None,
            indexed_at_ms: None,
            score: 0.0,
        }
    }

    #[tokio::test]
    async fn embedding_scores_by_token_overlap() -> Result<()> {
        let engine = InMemoryEmbedding::new(vec![
            hit("src/runtime.rs", "fn run loop"),
            hit("src/other.rs", "unrelated"),
        ]);
        let hits = engine
            .semantic_search(
                &RequestContext::new_request(),
                Path::new("/repo"),
                "run loop".into(),
                10,
                0.3,
            )
            .await?;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].relative_path.as_ref(), "src/runtime.rs");
        Ok(())
    }

    #[tokio::test]
    async fn failure_needle_fails_the_pass() {
        let engine =
            InMemoryEmbedding::new(vec![hit("a.rs", "x")]).with_failure_needle("boom");
        let result = engine
            .semantic_search(
                &RequestContext::new_request(),
                Path::new("/repo"),
                "boom query".into(),
                10,
                0.0,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn context_round_trips_markers() -> Result<()> {
        let context = InMemoryContext::default();
        let ctx = RequestContext::new_request();
        let root = Path::new("/repo");

        assert!(
            context
                .get_index_completion_marker(&ctx, root)
                .await?
                .is_none()
        );

        context
            .seed_marker(root, serde_json::json!({ "kind": "whatever" }))
            .await;
        assert!(
            context
                .get_index_completion_marker(&ctx, root)
                .await?
                .is_some()
        );

        context.clear_index_completion_marker(&ctx, root).await?;
        assert!(
            context
                .get_index_completion_marker(&ctx, root)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn store_limit_gates_creation() -> Result<()> {
        let store = InMemoryVectorStore::new(Some(1));
        let ctx = RequestContext::new_request();
        let name = CollectionName::parse("code_chunks_a").map_err(ErrorEnvelope::from)?;
        store.add_collection(&name, Some("/repo"), 1).await;

        let limit = store.check_collection_limit(&ctx).await?;
        assert!(!limit.can_create);
        assert_eq!(limit.existing, 1);
        Ok(())
    }
}
