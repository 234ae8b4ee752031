//! # satori-app
//!
//! The query core: readiness gate, completion-proof validation, the
//! multi-pass retrieval pipeline, grouping and diversity, noise hints, the
//! indexing lifecycle with recovery and reconcile, and the call-graph and
//! outline readers.
//!
//! Everything here is deterministic given the same collaborator responses;
//! external I/O goes through the ports.

pub mod callgraph;
pub mod changed_files;
pub mod clock;
pub mod deps;
pub mod gate;
pub mod lifecycle;
pub mod proof;
pub mod search;
pub mod snapshot;

pub use callgraph::*;
pub use changed_files::*;
pub use clock::*;
pub use deps::*;
pub use gate::*;
pub use lifecycle::*;
pub use proof::*;
pub use search::*;
pub use snapshot::*;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
