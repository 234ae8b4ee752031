//! # satori-domain
//!
//! Domain entities and value objects for the satori code-intelligence core:
//! index fingerprints, the per-codebase status machine, completion markers,
//! query operators, path classification, search candidates/groups with their
//! deterministic ordering contract, and the call-graph sidecar document.
//!
//! This crate depends only on `satori-shared`.

pub mod constants;
pub mod entry;
pub mod fingerprint;
pub mod marker;
pub mod operators;
pub mod paths;
pub mod primitives;
pub mod search;
pub mod sidecar;
pub mod spans;

pub use constants::*;
pub use entry::*;
pub use fingerprint::*;
pub use marker::*;
pub use operators::*;
pub use paths::*;
pub use primitives::*;
pub use search::*;
pub use sidecar::*;
pub use spans::*;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }
}
