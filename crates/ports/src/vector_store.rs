//! Vector store boundary contract.

use crate::BoxFuture;
use satori_domain::CollectionName;
use satori_shared::{RequestContext, Result};
use serde_json::Value;

/// Summary of one remote collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDetails {
    /// Collection name.
    pub name: CollectionName,
    /// Codebase path recorded in collection metadata, when present.
    pub codebase_path: Option<Box<str>>,
    /// Creation timestamp (epoch milliseconds), when the backend reports one.
    pub created_at_ms: Option<u64>,
}

/// Result of a collection-limit probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionLimit {
    /// True when another collection can still be created.
    pub can_create: bool,
    /// Backend limit, when known.
    pub limit: Option<u32>,
    /// Existing collection count.
    pub existing: u32,
}

/// Backend identity reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    /// Provider id (e.g. `zilliz`).
    pub provider: Box<str>,
    /// Human-readable description (version, endpoint class).
    pub description: Box<str>,
}

/// A raw row returned by `query`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    /// Projected fields keyed by field name.
    pub fields: serde_json::Map<String, Value>,
}

/// Boundary contract for the vector store.
pub trait VectorStorePort: Send + Sync {
    /// List collection names.
    fn list_collections(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<CollectionName>>>;

    /// List collections with metadata.
    fn list_collection_details(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<Vec<CollectionDetails>>>;

    /// True when the collection exists.
    fn has_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<bool>>;

    /// Drop a collection.
    fn drop_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<()>>;

    /// Run a filtered projection query against a collection.
    fn query(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        filter: Box<str>,
        projection: Vec<Box<str>>,
        limit: Option<u32>,
    ) -> BoxFuture<'_, Result<Vec<StoreRow>>>;

    /// Probe whether another collection can be created.
    fn check_collection_limit(
        &self,
        ctx: &RequestContext,
    ) -> BoxFuture<'_, Result<CollectionLimit>>;

    /// Identify the backend.
    fn backend_info(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<BackendInfo>>;
}
