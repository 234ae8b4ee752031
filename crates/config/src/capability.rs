//! Reranker capability resolution.
//!
//! Decides reranker availability and the default-on policy from the
//! configured providers. The reranker is Voyage-hosted, so availability
//! tracks the Voyage key and the ranker model; the performance profile
//! tracks the encoder provider.

use crate::schema::{EncoderProvider, ValidatedRuntimeConfig};
use serde::{Deserialize, Serialize};

/// Expected end-to-end latency class for the search pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceProfile {
    /// Hosted encoder; reranking adds acceptable latency.
    Fast,
    /// Local/slow encoder; reranking is off by default.
    Slow,
}

impl PerformanceProfile {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }
}

/// Resolved capabilities for the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// True when reranker calls can be made at all.
    pub has_reranker: bool,
    /// Latency class of the configured encoder.
    pub performance_profile: PerformanceProfile,
    /// True when searches rerank by default.
    pub default_rerank_enabled: bool,
}

/// Resolve capabilities from a validated configuration.
#[must_use]
pub fn resolve_capabilities(config: &ValidatedRuntimeConfig) -> Capabilities {
    let has_reranker = config.voyage_key.is_some() && config.ranker_model.is_some();

    let performance_profile = if config.encoder_provider == EncoderProvider::VoyageAi {
        PerformanceProfile::Fast
    } else {
        PerformanceProfile::Slow
    };

    let default_rerank_enabled = has_reranker
        && performance_profile == PerformanceProfile::Fast
        && config.rerank_enabled_override != Some(false);

    Capabilities {
        has_reranker,
        performance_profile,
        default_rerank_enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RuntimeConfig, RerankerConfig, EncoderConfig};

    fn config(
        provider: &str,
        voyage_key: Option<&str>,
        ranker_model: Option<&str>,
    ) -> ValidatedRuntimeConfig {
        let raw = RuntimeConfig {
            encoder: EncoderConfig {
                provider: EncoderProvider::parse(provider).unwrap_or(EncoderProvider::VoyageAi),
                ..EncoderConfig::default()
            },
            voyage_key: voyage_key.map(str::to_owned),
            reranker: RerankerConfig {
                model: ranker_model.map(str::to_owned),
                enabled: None,
            },
            ..RuntimeConfig::default()
        };
        #[allow(clippy::unwrap_used, reason = "test fixture on known-valid input")]
        let validated = raw.validate_and_normalize().unwrap();
        validated
    }

    #[test]
    fn voyage_with_key_and_model_enables_everything() {
        let capabilities =
            resolve_capabilities(&config("VoyageAI", Some("k"), Some("rerank-2.5")));
        assert!(capabilities.has_reranker);
        assert_eq!(capabilities.performance_profile, PerformanceProfile::Fast);
        assert!(capabilities.default_rerank_enabled);
    }

    #[test]
    fn missing_key_disables_the_reranker() {
        let capabilities = resolve_capabilities(&config("VoyageAI", None, Some("rerank-2.5")));
        assert!(!capabilities.has_reranker);
        assert!(!capabilities.default_rerank_enabled);
    }

    #[test]
    fn slow_encoder_turns_default_rerank_off_even_with_a_key() {
        let capabilities = resolve_capabilities(&config("Ollama", Some("k"), Some("rerank-2.5")));
        assert_eq!(capabilities.performance_profile, PerformanceProfile::Slow);
        assert!(!capabilities.default_rerank_enabled);
    }

    #[test]
    fn explicit_disable_wins_over_default_on() {
        let mut validated = config("VoyageAI", Some("k"), Some("rerank-2.5"));
        validated.rerank_enabled_override = Some(false);
        let capabilities = resolve_capabilities(&validated);
        assert!(capabilities.has_reranker);
        assert!(!capabilities.default_rerank_enabled);
    }
}
