//! Validated identifier primitives.

use satori_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for identifier primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `CollectionName` is empty after trimming.
    EmptyCollectionName,
    /// `CollectionName` violates the allowed pattern.
    InvalidCollectionName {
        /// Trimmed collection name that failed validation.
        input: String,
    },
    /// Derived collection name is invalid (invariant violation).
    DerivedCollectionNameInvalid {
        /// Candidate collection name that failed validation.
        candidate: String,
    },
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCollectionName => formatter.write_str("collectionName must be non-empty"),
            Self::InvalidCollectionName { .. } => {
                formatter.write_str("collectionName must match /^[a-zA-Z][a-zA-Z0-9_]*$/")
            },
            Self::DerivedCollectionNameInvalid { .. } => {
                formatter.write_str("derived collection name is invalid (this is a bug)")
            },
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let code = ErrorCode::new("domain", "invalid_collection_name");
        match error {
            PrimitiveError::EmptyCollectionName => Self::expected(code, error.to_string()),
            PrimitiveError::InvalidCollectionName { ref input } => {
                let input = input.clone();
                Self::expected(code, error.to_string()).with_metadata("input", input)
            },
            PrimitiveError::DerivedCollectionNameInvalid { ref candidate } => {
                let candidate = candidate.clone();
                Self::invariant(code, error.to_string()).with_metadata("candidate", candidate)
            },
        }
    }
}

/// Identifier for a vector collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionName(Box<str>);

impl CollectionName {
    /// Parse a collection name that satisfies the allowlist pattern.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PrimitiveError::EmptyCollectionName);
        }

        if !is_valid_collection_name(trimmed) {
            return Err(PrimitiveError::InvalidCollectionName {
                input: trimmed.to_owned(),
            });
        }

        Ok(Self(trimmed.to_owned().into_boxed_str()))
    }

    /// Access the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Derive a deterministic collection name for a canonical codebase root.
///
/// The name embeds a short digest of the canonical root so every codebase
/// maps to exactly one collection per schema family.
pub fn derive_collection_name(canonical_root: &str) -> Result<CollectionName, PrimitiveError> {
    let digest = md5::compute(canonical_root.as_bytes());
    let hash = format!("{digest:x}");
    let hash_prefix: String = hash.chars().take(8).collect();
    let candidate = format!("code_chunks_{hash_prefix}");

    CollectionName::parse(candidate.as_str())
        .map_err(|_| PrimitiveError::DerivedCollectionNameInvalid { candidate })
}

fn is_valid_collection_name(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }

    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
