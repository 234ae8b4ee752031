//! # satori-shared
//!
//! Shared foundation for the satori workspace: the structured error
//! envelope, the workspace `Result` alias, request-scoped context
//! (correlation, cancellation, deadline), the settle-all primitive, and
//! atomic JSON persistence.
//!
//! This crate has no workspace dependencies.

pub mod concurrency;
pub mod errors;
pub mod persist;
pub mod redaction;
pub mod result;

pub use concurrency::*;
pub use errors::*;
pub use persist::*;
pub use redaction::*;
pub use result::*;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
