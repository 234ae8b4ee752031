//! # satori-ports
//!
//! Port traits between the query core and its external collaborators: the
//! vector store, the embedding engine, the reranker, the indexing context,
//! the VCS, and the structured logger.
//!
//! This crate depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// Boundary traits carry I/O-bound work, so boxed futures are acceptable;
/// hot paths stay inside the core and never cross a port per item.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod context;
pub mod embedding;
pub mod logger;
pub mod reranker;
pub mod vcs;
pub mod vector_store;

pub use context::*;
pub use embedding::*;
pub use logger::*;
pub use reranker::*;
pub use vcs::*;
pub use vector_store::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `satori-domain`.
pub use satori_domain::{
    ChunkHit, CollectionName, CompletionMarker, IndexFingerprint, Language, LineSpan,
};

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::domain_crate_version;
    use satori_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if in_deps && line.starts_with("satori-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_owned());
            }
        }

        deps
    }

    #[test]
    fn ports_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["satori-domain", "satori-shared"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }

        for expected in allowed {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn ports_crate_compiles() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
