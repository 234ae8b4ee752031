//! # satori-api
//!
//! The tool-call surface: validated request DTOs, response envelopes, and
//! the list formatter. Dynamic tool arguments collapse into the typed
//! requests of `satori-app`; unknown fields and unknown enum strings are
//! terminal invalid-request errors.

pub mod v1;

/// Returns the api crate version.
#[must_use]
pub const fn api_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_crate_compiles() {
        assert!(!api_crate_version().is_empty());
    }
}
