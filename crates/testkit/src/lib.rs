//! # satori-testkit
//!
//! Deterministic in-memory implementations of the port contracts, intended
//! for unit/integration tests and local smoke runs without external
//! dependencies.

pub mod in_memory;

pub use in_memory::*;

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
