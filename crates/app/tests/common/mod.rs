//! Shared harness wiring the query core to in-memory collaborators.
#![allow(dead_code, reason = "each test binary uses a subset of the harness")]

use satori_app::{
    AppDeps, ChangedFilesCache, FixedClock, SnapshotStore, SyncGuard,
};
use satori_config::{Capabilities, PerformanceProfile};
use satori_domain::{
    ChunkHit, CodebaseStatus, CompletionMarker, FingerprintSource, IndexFingerprint, LineSpan,
};
use satori_shared::Result;
use satori_testkit::{
    InMemoryContext, InMemoryEmbedding, InMemoryVectorStore, RerankScript, ScriptedReranker,
    StaticVcs,
};
use std::path::Path;
use std::sync::Arc;

/// Fixed "now" used by harness clocks.
pub const NOW_MS: u64 = 1_700_000_000_000;

/// The runtime fingerprint used across tests.
pub fn runtime_fingerprint() -> IndexFingerprint {
    IndexFingerprint {
        embedding_provider: "voyageai".into(),
        embedding_model: "voyage-4-large".into(),
        embedding_dimension: 1024,
        vector_store_provider: "zilliz".into(),
        schema_version: "hybrid_v3".into(),
    }
}

/// A fingerprint from an older model generation.
pub fn legacy_fingerprint() -> IndexFingerprint {
    IndexFingerprint {
        embedding_model: "voyage-3".into(),
        ..runtime_fingerprint()
    }
}

/// One corpus chunk.
pub fn chunk(
    path: &str,
    start: u32,
    end: u32,
    symbol: Option<&str>,
    content: &str,
) -> ChunkHit {
    #[allow(clippy::unwrap_used, reason = "test spans are valid")]
    let span = LineSpan::new(start, end).unwrap();
    ChunkHit {
        relative_path: path.into(),
        span,
        language: Some(satori_domain::Language::TypeScript),
        content: content.into(),
        symbol_id: symbol.map(|s| Box::from(format!("sym_{s}"))),
        symbol_label: symbol.map(Box::from),
        indexed_at_ms: Some(NOW_MS - 1_000),
        score: 0.0,
    }
}

/// Everything a test needs to drive the core.
pub struct Harness {
    /// Wired dependencies.
    pub deps: AppDeps,
    /// The in-memory context (markers, scripts).
    pub context: Arc<InMemoryContext>,
    /// The in-memory vector store.
    pub store: Arc<InMemoryVectorStore>,
    #[allow(dead_code, reason = "keeps the snapshot file alive")]
    dir: tempfile::TempDir,
}

/// Options for building a harness.
pub struct HarnessOptions {
    /// Corpus served by the embedding engine.
    pub corpus: Vec<ChunkHit>,
    /// Reranker script (None removes the reranker).
    pub reranker: Option<RerankScript>,
    /// Dirty files reported by the VCS.
    pub changed_files: Vec<&'static str>,
    /// Fail semantic passes whose query contains this needle.
    pub failure_needle: Option<&'static str>,
    /// Clock reading.
    pub now_ms: u64,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            corpus: Vec::new(),
            reranker: Some(RerankScript::Identity),
            changed_files: Vec::new(),
            failure_needle: None,
            now_ms: NOW_MS,
        }
    }
}

/// Build a harness.
pub fn harness(options: HarnessOptions) -> Result<Harness> {
    let dir = tempfile::tempdir()?;
    let snapshot = Arc::new(SnapshotStore::open(dir.path().join("snapshot.json")));

    let mut embedding = InMemoryEmbedding::new(options.corpus);
    if let Some(needle) = options.failure_needle {
        embedding = embedding.with_failure_needle(needle);
    }

    let context = Arc::new(InMemoryContext::default());
    let store = Arc::new(InMemoryVectorStore::default());
    let has_reranker = options.reranker.is_some();

    #[allow(trivial_casts)]
    let context_port = Arc::clone(&context) as Arc<dyn satori_ports::ContextPort>;
    #[allow(trivial_casts)]
    let store_port = Arc::clone(&store) as Arc<dyn satori_ports::VectorStorePort>;
    #[allow(trivial_casts)]
    let reranker_port = options
        .reranker
        .map(|script| Arc::new(ScriptedReranker::new(script)) as Arc<dyn satori_ports::RerankerPort>);

    let deps = AppDeps {
        snapshot,
        context: context_port,
        embedding: Arc::new(embedding),
        store: store_port,
        reranker: reranker_port,
        vcs: Arc::new(StaticVcs::with_changed(&options.changed_files)),
        changed_files: Arc::new(ChangedFilesCache::default()),
        sync_guard: Arc::new(SyncGuard::default()),
        capabilities: Capabilities {
            has_reranker,
            performance_profile: PerformanceProfile::Fast,
            default_rerank_enabled: has_reranker,
        },
        runtime_fingerprint: runtime_fingerprint(),
        clock: Arc::new(FixedClock(options.now_ms)),
        logger: None,
    };

    Ok(Harness {
        deps,
        context,
        store,
        dir,
    })
}

/// Seed an indexed entry plus a valid completion marker for `root`.
pub async fn seed_indexed(harness: &Harness, root: &str) -> Result<()> {
    seed_status(
        harness,
        root,
        CodebaseStatus::Indexed {
            indexed_files: 12,
            total_chunks: 340,
        },
    )
    .await?;
    seed_valid_marker(harness, root).await
}

/// Seed a status without touching markers.
pub async fn seed_status(harness: &Harness, root: &str, status: CodebaseStatus) -> Result<()> {
    harness.deps.snapshot.set_status(root, status, NOW_MS).await?;
    harness
        .deps
        .snapshot
        .set_fingerprint(root, runtime_fingerprint(), FingerprintSource::Inferred, NOW_MS)
        .await
}

/// Seed a valid marker document for `root`.
pub async fn seed_valid_marker(harness: &Harness, root: &str) -> Result<()> {
    let marker = CompletionMarker::for_run(
        root,
        runtime_fingerprint(),
        12,
        340,
        "2026-07-01T10:00:00Z"
            .parse()
            .map_err(|_| satori_shared::ErrorEnvelope::expected(
                satori_shared::ErrorCode::internal(),
                "bad timestamp literal",
            ))?,
    );
    harness
        .context
        .seed_marker(Path::new(root), serde_json::to_value(&marker)?)
        .await;
    Ok(())
}
