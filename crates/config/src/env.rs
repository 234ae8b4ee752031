//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict (invalid values fail fast), deterministic, and safe
//! (secret values are redacted in error metadata). Prefixed `SATORI_*` names
//! win over their unprefixed aliases.

use crate::schema::{EncoderProvider, RuntimeConfig};
use satori_shared::{ErrorCode, ErrorEnvelope, redact_if_secret};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Env var: encoder provider.
pub const ENV_ENCODER_PROVIDER: &str = "SATORI_ENCODER_PROVIDER";
/// Env var: encoder provider (alias).
pub const ENV_ENCODER_PROVIDER_ALIAS: &str = "ENCODER_PROVIDER";
/// Env var: encoder model.
pub const ENV_ENCODER_MODEL: &str = "SATORI_ENCODER_MODEL";
/// Env var: encoder model (alias).
pub const ENV_ENCODER_MODEL_ALIAS: &str = "ENCODER_MODEL";
/// Env var: encoder dimension.
pub const ENV_ENCODER_DIMENSION: &str = "SATORI_ENCODER_DIMENSION";
/// Env var: encoder base URL.
pub const ENV_ENCODER_BASE_URL: &str = "SATORI_ENCODER_BASE_URL";
/// Env var: Voyage API key (secret).
pub const ENV_VOYAGE_KEY: &str = "SATORI_VOYAGE_API_KEY";
/// Env var: Voyage API key (alias).
pub const ENV_VOYAGE_KEY_ALIAS: &str = "VOYAGE_API_KEY";
/// Env var: store provider.
pub const ENV_STORE_PROVIDER: &str = "SATORI_STORE_PROVIDER";
/// Env var: store endpoint.
pub const ENV_STORE_ENDPOINT: &str = "SATORI_STORE_ENDPOINT";
/// Env var: store token (secret).
pub const ENV_STORE_TOKEN: &str = "SATORI_STORE_TOKEN";
/// Env var: ranker model.
pub const ENV_RANKER_MODEL: &str = "SATORI_RANKER_MODEL";
/// Env var: rerank default override.
pub const ENV_RERANK_ENABLED: &str = "SATORI_RERANK_ENABLED";
/// Env var: snapshot file path.
pub const ENV_SNAPSHOT_PATH: &str = "SATORI_SNAPSHOT_PATH";

/// Typed env parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// The variable holds a value outside the allowed set.
    InvalidValue {
        /// Variable name.
        variable: &'static str,
        /// Offending value, redacted when the variable is a secret.
        value: String,
    },
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { variable, value } => {
                write!(formatter, "{variable} holds an invalid value: {value}")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let EnvParseError::InvalidValue { variable, ref value } = error;
        let value = value.clone();
        Self::expected(ErrorCode::new("config", "invalid_env"), error.to_string())
            .with_metadata("variable", variable)
            .with_metadata("value", value)
    }
}

/// Apply environment overrides onto a raw config.
pub fn apply_env_overrides(
    mut config: RuntimeConfig,
    env: &BTreeMap<String, String>,
) -> Result<RuntimeConfig, EnvParseError> {
    if let Some(raw) = lookup(env, ENV_ENCODER_PROVIDER, Some(ENV_ENCODER_PROVIDER_ALIAS)) {
        let provider = EncoderProvider::parse(raw).ok_or_else(|| EnvParseError::InvalidValue {
            variable: ENV_ENCODER_PROVIDER,
            value: redact_if_secret(ENV_ENCODER_PROVIDER, raw),
        })?;
        config.encoder.provider = provider;
    }

    if let Some(raw) = lookup(env, ENV_ENCODER_MODEL, Some(ENV_ENCODER_MODEL_ALIAS)) {
        config.encoder.model = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_ENCODER_DIMENSION, None) {
        let dimension = raw
            .parse::<u32>()
            .map_err(|_| EnvParseError::InvalidValue {
                variable: ENV_ENCODER_DIMENSION,
                value: raw.to_owned(),
            })?;
        config.encoder.dimension = Some(dimension);
    }

    if let Some(raw) = lookup(env, ENV_ENCODER_BASE_URL, None) {
        config.encoder.base_url = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_VOYAGE_KEY, Some(ENV_VOYAGE_KEY_ALIAS)) {
        config.voyage_key = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_STORE_PROVIDER, None) {
        config.store.provider = raw.to_owned();
    }

    if let Some(raw) = lookup(env, ENV_STORE_ENDPOINT, None) {
        config.store.endpoint = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_STORE_TOKEN, None) {
        config.store.token = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_RANKER_MODEL, None) {
        config.reranker.model = Some(raw.to_owned());
    }

    if let Some(raw) = lookup(env, ENV_RERANK_ENABLED, None) {
        config.reranker.enabled = Some(parse_bool(ENV_RERANK_ENABLED, raw)?);
    }

    if let Some(raw) = lookup(env, ENV_SNAPSHOT_PATH, None) {
        config.snapshot_path = Some(PathBuf::from(raw));
    }

    Ok(config)
}

fn lookup<'a>(
    env: &'a BTreeMap<String, String>,
    name: &str,
    alias: Option<&str>,
) -> Option<&'a str> {
    let direct = env.get(name).map(String::as_str).map(str::trim);
    if let Some(value) = direct.filter(|value| !value.is_empty()) {
        return Some(value);
    }

    alias
        .and_then(|alias| env.get(alias))
        .map(String::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_bool(variable: &'static str, raw: &str) -> Result<bool, EnvParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(EnvParseError::InvalidValue {
            variable,
            value: raw.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn prefixed_names_win_over_aliases() -> Result<(), EnvParseError> {
        let env = env(&[
            (ENV_ENCODER_PROVIDER, "Ollama"),
            (ENV_ENCODER_PROVIDER_ALIAS, "VoyageAI"),
        ]);
        let config = apply_env_overrides(RuntimeConfig::default(), &env)?;
        assert_eq!(config.encoder.provider, EncoderProvider::Ollama);
        Ok(())
    }

    #[test]
    fn aliases_apply_when_prefixed_is_absent() -> Result<(), EnvParseError> {
        let env = env(&[(ENV_VOYAGE_KEY_ALIAS, "vk-123")]);
        let config = apply_env_overrides(RuntimeConfig::default(), &env)?;
        assert_eq!(config.voyage_key.as_deref(), Some("vk-123"));
        Ok(())
    }

    #[test]
    fn invalid_provider_fails_fast() {
        let env = env(&[(ENV_ENCODER_PROVIDER, "Cohere")]);
        let error = apply_env_overrides(RuntimeConfig::default(), &env).err();
        assert!(matches!(error, Some(EnvParseError::InvalidValue { .. })));
    }

    #[test]
    fn invalid_dimension_fails_fast() {
        let env = env(&[(ENV_ENCODER_DIMENSION, "many")]);
        assert!(apply_env_overrides(RuntimeConfig::default(), &env).is_err());
    }

    #[test]
    fn bool_parsing_accepts_common_forms() -> Result<(), EnvParseError> {
        for (raw, expected) in [("true", true), ("0", false), ("YES", true)] {
            let env = env(&[(ENV_RERANK_ENABLED, raw)]);
            let config = apply_env_overrides(RuntimeConfig::default(), &env)?;
            assert_eq!(config.reranker.enabled, Some(expected));
        }
        Ok(())
    }

    #[test]
    fn blank_values_are_ignored() -> Result<(), EnvParseError> {
        let env = env(&[(ENV_RANKER_MODEL, "  ")]);
        let config = apply_env_overrides(RuntimeConfig::default(), &env)?;
        assert!(config.reranker.model.is_none());
        Ok(())
    }
}
