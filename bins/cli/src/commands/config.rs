//! `config show`: effective configuration with secrets redacted.

use crate::error::CliError;
use crate::format::{OutputArgs, render};
use satori_config::{Capabilities, load_config, resolve_capabilities};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Redacted effective-config summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    /// Encoder provider.
    pub encoder_provider: String,
    /// Encoder model.
    pub encoder_model: String,
    /// Embedding dimension.
    pub encoder_dimension: u32,
    /// True when a Voyage key is configured (value never printed).
    pub voyage_key_present: bool,
    /// Store provider.
    pub store_provider: String,
    /// Ranker model, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranker_model: Option<String>,
    /// Resolved capabilities.
    pub capabilities: Capabilities,
}

/// Execute `config show`.
pub fn run_config_show(
    output: OutputArgs,
    config_path: Option<&Path>,
    env: &BTreeMap<String, String>,
) -> Result<String, CliError> {
    let validated = load_config(config_path, env).map_err(CliError::from)?;
    let capabilities = resolve_capabilities(&validated);

    let summary = ConfigSummary {
        encoder_provider: validated.encoder_provider.as_str().to_owned(),
        encoder_model: validated.encoder_model.to_string(),
        encoder_dimension: validated.encoder_dimension,
        voyage_key_present: validated.voyage_key.is_some(),
        store_provider: validated.store_provider.to_string(),
        ranker_model: validated.ranker_model.as_deref().map(str::to_owned),
        capabilities,
    };

    render(output, &summary, |summary| {
        format!(
            "encoder: {} / {} ({}d)\nstore: {}\nreranker: {} (default {})\n",
            summary.encoder_provider,
            summary.encoder_model,
            summary.encoder_dimension,
            summary.store_provider,
            if summary.capabilities.has_reranker {
                summary.ranker_model.as_deref().unwrap_or("configured")
            } else {
                "unavailable"
            },
            if summary.capabilities.default_rerank_enabled {
                "on"
            } else {
                "off"
            },
        )
    })
    .map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_config::env::{ENV_RANKER_MODEL, ENV_VOYAGE_KEY};

    #[test]
    fn summary_never_contains_the_key_value() -> Result<(), CliError> {
        let mut env = BTreeMap::new();
        env.insert(ENV_VOYAGE_KEY.to_owned(), "vk-secret-123".to_owned());
        env.insert(ENV_RANKER_MODEL.to_owned(), "rerank-2.5".to_owned());

        let rendered = run_config_show(OutputArgs { json: true }, None, &env)?;
        assert!(!rendered.contains("vk-secret-123"));
        assert!(rendered.contains("\"voyageKeyPresent\": true"));
        assert!(rendered.contains("rerank-2.5"));
        Ok(())
    }
}
