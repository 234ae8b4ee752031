//! Reranker boundary contract.

use crate::BoxFuture;
use satori_shared::{RequestContext, Result};

/// Options forwarded to the reranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerankOptions {
    /// Maximum ranks to return.
    pub top_k: usize,
    /// Whether the provider may truncate long documents.
    pub truncation: bool,
    /// Whether document bodies should be echoed back.
    pub return_documents: bool,
}

/// One reranked entry: the index of the input document at this rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankedEntry {
    /// Zero-based index into the submitted document list.
    pub document_index: usize,
    /// Provider relevance score.
    pub relevance_score: f64,
}

/// Boundary contract for the reranker.
pub trait RerankerPort: Send + Sync {
    /// Rerank `documents` against `query`; returns entries in rank order.
    fn rerank(
        &self,
        ctx: &RequestContext,
        query: Box<str>,
        documents: Vec<Box<str>>,
        options: RerankOptions,
    ) -> BoxFuture<'_, Result<Vec<RerankedEntry>>>;
}
