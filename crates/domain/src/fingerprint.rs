//! Index fingerprints: the canonical identity of a compatible index.

use satori_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for fingerprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// A scalar field is empty after trimming.
    EmptyField {
        /// Field name as it appears on the wire.
        field: &'static str,
    },
    /// The embedding dimension must be a positive integer.
    NonPositiveDimension,
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyField { field } => {
                write!(formatter, "fingerprint field {field} must be non-empty")
            },
            Self::NonPositiveDimension => {
                formatter.write_str("embeddingDimension must be a positive integer")
            },
        }
    }
}

impl std::error::Error for FingerprintError {}

impl From<FingerprintError> for ErrorEnvelope {
    fn from(error: FingerprintError) -> Self {
        Self::expected(
            ErrorCode::new("domain", "invalid_fingerprint"),
            error.to_string(),
        )
    }
}

/// Five-field identity of the index schema, embedding model, and store.
///
/// Equality is field-wise; any difference between the runtime fingerprint and
/// an indexed fingerprint forces `requires_reindex` before any read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFingerprint {
    /// Embedding provider id (e.g. `voyageai`).
    pub embedding_provider: Box<str>,
    /// Embedding model id (e.g. `voyage-4-large`).
    pub embedding_model: Box<str>,
    /// Embedding dimension (positive).
    pub embedding_dimension: u32,
    /// Vector store provider id (e.g. `zilliz`).
    pub vector_store_provider: Box<str>,
    /// Schema version tag (e.g. `hybrid_v3`).
    pub schema_version: Box<str>,
}

impl IndexFingerprint {
    /// Construct a validated fingerprint.
    pub fn new(
        embedding_provider: impl AsRef<str>,
        embedding_model: impl AsRef<str>,
        embedding_dimension: u32,
        vector_store_provider: impl AsRef<str>,
        schema_version: impl AsRef<str>,
    ) -> Result<Self, FingerprintError> {
        let embedding_provider = required_field(embedding_provider.as_ref(), "embeddingProvider")?;
        let embedding_model = required_field(embedding_model.as_ref(), "embeddingModel")?;
        let vector_store_provider =
            required_field(vector_store_provider.as_ref(), "vectorStoreProvider")?;
        let schema_version = required_field(schema_version.as_ref(), "schemaVersion")?;
        if embedding_dimension == 0 {
            return Err(FingerprintError::NonPositiveDimension);
        }

        Ok(Self {
            embedding_provider,
            embedding_model,
            embedding_dimension,
            vector_store_provider,
            schema_version,
        })
    }

    /// True when every field matches `other`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self == other
    }

    /// Validate a deserialized fingerprint (serde bypasses `new`).
    pub fn validate(&self) -> Result<(), FingerprintError> {
        required_field(&self.embedding_provider, "embeddingProvider")?;
        required_field(&self.embedding_model, "embeddingModel")?;
        required_field(&self.vector_store_provider, "vectorStoreProvider")?;
        required_field(&self.schema_version, "schemaVersion")?;
        if self.embedding_dimension == 0 {
            return Err(FingerprintError::NonPositiveDimension);
        }
        Ok(())
    }
}

impl fmt::Display for IndexFingerprint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}/{}/{}d via {} ({})",
            self.embedding_provider,
            self.embedding_model,
            self.embedding_dimension,
            self.vector_store_provider,
            self.schema_version
        )
    }
}

/// Provenance of a stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintSource {
    /// Verified against the completion proof.
    Verified,
    /// Inferred from local state without a proof check.
    Inferred,
}

impl FingerprintSource {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Inferred => "inferred",
        }
    }
}

fn required_field(value: &str, field: &'static str) -> Result<Box<str>, FingerprintError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FingerprintError::EmptyField { field });
    }
    Ok(trimmed.to_owned().into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(model: &str) -> Result<IndexFingerprint, FingerprintError> {
        IndexFingerprint::new("voyageai", model, 1024, "zilliz", "hybrid_v3")
    }

    #[test]
    fn equality_is_field_wise() -> Result<(), FingerprintError> {
        let a = fingerprint("voyage-4-large")?;
        let b = fingerprint("voyage-4-large")?;
        let c = fingerprint("voyage-3")?;

        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        Ok(())
    }

    #[test]
    fn constructor_rejects_empty_fields() {
        let error = IndexFingerprint::new(" ", "m", 4, "s", "v").err();
        assert!(matches!(error, Some(FingerprintError::EmptyField { .. })));
    }

    #[test]
    fn constructor_rejects_zero_dimension() {
        let error = IndexFingerprint::new("p", "m", 0, "s", "v").err();
        assert!(matches!(error, Some(FingerprintError::NonPositiveDimension)));
    }

    #[test]
    fn serializes_with_camel_case() -> Result<(), Box<dyn std::error::Error>> {
        let value = serde_json::to_value(fingerprint("voyage-4-large")?)?;
        let expected = serde_json::json!({
            "embeddingProvider": "voyageai",
            "embeddingModel": "voyage-4-large",
            "embeddingDimension": 1024,
            "vectorStoreProvider": "zilliz",
            "schemaVersion": "hybrid_v3"
        });
        assert_eq!(value, expected);
        Ok(())
    }
}
