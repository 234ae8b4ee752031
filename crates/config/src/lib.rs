//! # satori-config
//!
//! Runtime configuration for the satori core: schema with strict validation
//! and deterministic normalization, env-var overrides, file loading
//! (JSON/TOML), the runtime fingerprint, and the reranker capability
//! resolver.

pub mod capability;
pub mod env;
pub mod load;
pub mod schema;

pub use capability::*;
pub use env::*;
pub use load::*;
pub use schema::*;

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
