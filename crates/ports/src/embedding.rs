//! Embedding engine boundary contract.
//!
//! The engine owns both the embedding model and the semantic query path: the
//! core hands it a query plus limits and receives scored chunk hits.

use crate::BoxFuture;
use satori_domain::ChunkHit;
use satori_shared::{RequestContext, Result};
use std::path::Path;

/// Provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingProviderInfo {
    /// Stable provider id (e.g. `voyageai`).
    pub id: Box<str>,
    /// Model id (e.g. `voyage-4-large`).
    pub model: Box<str>,
}

/// Boundary contract for the embedding engine.
pub trait EmbeddingPort: Send + Sync {
    /// Provider identity.
    fn provider(&self) -> &EmbeddingProviderInfo;

    /// Embedding dimension.
    fn dimension(&self) -> u32;

    /// Run one semantic pass over the codebase rooted at `root`.
    ///
    /// Returns up to `limit` hits at or above the similarity `floor`.
    fn semantic_search(
        &self,
        ctx: &RequestContext,
        root: &Path,
        query: Box<str>,
        limit: u32,
        floor: f32,
    ) -> BoxFuture<'_, Result<Vec<ChunkHit>>>;
}
