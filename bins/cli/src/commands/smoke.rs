//! `smoke`: end-to-end exercise of the query core over in-memory
//! collaborators. Builds an index, runs a grouped search, and prints the
//! envelopes. No external services are touched.

use crate::error::CliError;
use crate::format::{OutputArgs, render};
use satori_api::v1::{
    ManageIndexRequestDto, SearchCodebaseRequestDto, manage_envelope, search_envelope,
    validate_manage_index, validate_search_codebase,
};
use satori_app::{
    AppDeps, ChangedFilesCache, SnapshotStore, SyncGuard, SystemClock, handle_manage_index,
    handle_search,
};
use satori_config::{load_config, resolve_capabilities};
use satori_domain::{ChunkHit, LineSpan};
use satori_shared::{ErrorEnvelope, RequestContext};
use satori_testkit::{
    InMemoryContext, InMemoryEmbedding, InMemoryVectorStore, RerankScript, ScriptedReranker,
    StaticVcs,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmokeReport {
    index: satori_api::v1::ManageIndexEnvelopeDto,
    search: satori_api::v1::SearchResponseEnvelopeDto,
}

fn smoke_corpus() -> Result<Vec<ChunkHit>, ErrorEnvelope> {
    let chunk = |path: &str, start, end, symbol: Option<&str>, content: &str| {
        Ok::<_, ErrorEnvelope>(ChunkHit {
            relative_path: path.into(),
            span: LineSpan::new(start, end).map_err(ErrorEnvelope::from)?,
            language: Some(satori_domain::Language::Rust),
            content: content.into(),
            symbol_id: symbol.map(|s| Box::from(format!("sym_{s}"))),
            symbol_label: symbol.map(Box::from),
            indexed_at_ms: None,
            score: 0.0,
        })
    };

    Ok(vec![
        chunk(
            "src/engine.rs",
            1,
            40,
            Some("engine_run"),
            "pub fn run(&mut self) { self.step_all(); }",
        )?,
        chunk(
            "src/engine.rs",
            42,
            80,
            Some("engine_step"),
            "fn step_all(&mut self) { for step in &self.steps { step.run(); } }",
        )?,
        chunk(
            "docs/engine.md",
            1,
            12,
            None,
            "The engine run loop processes steps in order.",
        )?,
    ])
}

fn smoke_deps(snapshot_dir: &std::path::Path) -> Result<AppDeps, CliError> {
    let validated = load_config(None, &BTreeMap::new()).map_err(CliError::from)?;
    let runtime_fingerprint = validated.runtime_fingerprint().map_err(CliError::from)?;
    let capabilities = resolve_capabilities(&validated);

    Ok(AppDeps {
        snapshot: Arc::new(SnapshotStore::open(snapshot_dir.join("snapshot.json"))),
        context: Arc::new(InMemoryContext::default()),
        embedding: Arc::new(InMemoryEmbedding::new(smoke_corpus().map_err(CliError::from)?)),
        store: Arc::new(InMemoryVectorStore::default()),
        reranker: Some(Arc::new(ScriptedReranker::new(RerankScript::Identity))),
        vcs: Arc::new(StaticVcs::with_changed(&[])),
        changed_files: Arc::new(ChangedFilesCache::default()),
        sync_guard: Arc::new(SyncGuard::default()),
        capabilities,
        runtime_fingerprint,
        clock: Arc::new(SystemClock),
        logger: None,
    })
}

/// Execute `smoke`.
pub async fn run_smoke(output: OutputArgs) -> Result<String, CliError> {
    let dir = tempfile_dir()?;
    let deps = smoke_deps(&dir)?;
    let ctx = RequestContext::new_request();
    let root = dir.join("workspace");
    std::fs::create_dir_all(&root)?;
    let root_str = root.to_string_lossy().into_owned();

    let index_dto = ManageIndexRequestDto {
        action: "create".to_owned(),
        path: root_str.clone(),
        force: None,
        zilliz_drop_collection: None,
        custom_extensions: None,
        ignore_patterns: None,
    };
    let index_request = validate_manage_index(&index_dto).map_err(ErrorEnvelope::from)?;
    let index_outcome = handle_manage_index(&ctx, &deps, index_request)
        .await
        .map_err(CliError::from)?;

    let search_dto = SearchCodebaseRequestDto {
        path: root_str.clone(),
        query: "engine run loop".to_owned(),
        scope: Some("runtime".to_owned()),
        result_mode: Some("grouped".to_owned()),
        group_by: Some("symbol".to_owned()),
        ranking_mode: Some("default".to_owned()),
        limit: Some(5),
        debug: Some(true),
    };
    let search_request = validate_search_codebase(&search_dto).map_err(ErrorEnvelope::from)?;
    let search_response = handle_search(&ctx, &deps, search_request)
        .await
        .map_err(CliError::from)?;

    let report = SmokeReport {
        index: manage_envelope(index_outcome),
        search: search_envelope(search_response, &root_str),
    };

    let cleanup = std::fs::remove_dir_all(&dir);
    drop(cleanup);

    render(output, &report, |report| {
        format!(
            "index: {}\nsearch: {} ({} results)\n",
            report.index.mode,
            report.search.status,
            report.search.results.len()
        )
    })
    .map_err(CliError::from)
}

fn tempfile_dir() -> Result<std::path::PathBuf, CliError> {
    let base = std::env::temp_dir().join(format!("satori-smoke-{}", std::process::id()));
    std::fs::create_dir_all(&base)?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn smoke_run_indexes_and_searches() -> Result<(), CliError> {
        let rendered = run_smoke(OutputArgs { json: true }).await?;
        assert!(rendered.contains("\"mode\": \"created\""));
        assert!(rendered.contains("\"status\": \"ok\""));
        Ok(())
    }

    #[test]
    fn smoke_corpus_is_well_formed() {
        let corpus = smoke_corpus();
        assert!(corpus.is_ok_and(|corpus| corpus.len() == 3));
    }
}
