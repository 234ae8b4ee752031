//! Config loading: defaults, optional file, env overrides, validation.

use crate::env::apply_env_overrides;
use crate::schema::{RuntimeConfig, ValidatedRuntimeConfig};
use satori_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Load the effective configuration.
///
/// Precedence (low to high): built-in defaults, config file, env overrides.
pub fn load_config(
    config_path: Option<&Path>,
    env: &BTreeMap<String, String>,
) -> Result<ValidatedRuntimeConfig> {
    let base = match config_path {
        Some(path) => read_config_file(path)?,
        None => RuntimeConfig::default(),
    };

    let merged = apply_env_overrides(base, env).map_err(ErrorEnvelope::from)?;
    merged.validate_and_normalize().map_err(ErrorEnvelope::from)
}

fn read_config_file(path: &Path) -> Result<RuntimeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|error| ErrorEnvelope::from(error).with_metadata("path", path.display().to_string()))?;

    let is_toml = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&raw).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_config_file"),
                error.to_string(),
            )
            .with_metadata("path", path.display().to_string())
        })
    } else {
        serde_json::from_str(&raw).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_config_file"),
                error.to_string(),
            )
            .with_metadata("path", path.display().to_string())
        })
    }
}
