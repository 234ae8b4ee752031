//! Completion markers: durable proof that an indexing run finished.

use crate::fingerprint::IndexFingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker document kind tag.
pub const COMPLETION_MARKER_KIND: &str = "satori_index_completion_v1";

/// Durable proof document written after a successful index build.
///
/// Lives in the vector store; cleared at indexing start and on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMarker {
    /// Document kind tag (`satori_index_completion_v1`).
    pub kind: Box<str>,
    /// Canonical codebase root the run indexed.
    pub codebase_path: Box<str>,
    /// Fingerprint the run was built under.
    pub fingerprint: IndexFingerprint,
    /// Files indexed by the run.
    pub indexed_files: u64,
    /// Chunks stored by the run.
    pub total_chunks: u64,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
    /// Unique id of the indexing run.
    pub run_id: Box<str>,
}

impl CompletionMarker {
    /// Build a marker for a finished run with a fresh run id.
    #[must_use]
    pub fn for_run(
        codebase_path: impl Into<Box<str>>,
        fingerprint: IndexFingerprint,
        indexed_files: u64,
        total_chunks: u64,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: COMPLETION_MARKER_KIND.into(),
            codebase_path: codebase_path.into(),
            fingerprint,
            indexed_files,
            total_chunks,
            completed_at,
            run_id: uuid::Uuid::new_v4().to_string().into_boxed_str(),
        }
    }
}

/// Reasons a marker payload fails structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerParseError {
    /// The `kind` tag is absent or not the supported value.
    InvalidKind,
    /// A required field is absent, the wrong type, or non-finite.
    InvalidPayload {
        /// Wire name of the offending field.
        field: &'static str,
    },
}

impl fmt::Display for MarkerParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKind => formatter.write_str("marker kind is not supported"),
            Self::InvalidPayload { field } => {
                write!(formatter, "marker field {field} is missing or malformed")
            },
        }
    }
}

impl std::error::Error for MarkerParseError {}

/// Parse and structurally validate a raw marker document.
///
/// Field checks are deliberately explicit so a malformed document maps to a
/// precise `invalid_payload` reason rather than a serde error string.
pub fn parse_completion_marker(raw: &Value) -> Result<CompletionMarker, MarkerParseError> {
    let kind = raw
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(MarkerParseError::InvalidKind)?;
    if kind != COMPLETION_MARKER_KIND {
        return Err(MarkerParseError::InvalidKind);
    }

    let codebase_path = non_empty_string(raw, "codebasePath")?;

    let fingerprint_value = raw
        .get("fingerprint")
        .ok_or(MarkerParseError::InvalidPayload {
            field: "fingerprint",
        })?;
    let fingerprint: IndexFingerprint = serde_json::from_value(fingerprint_value.clone())
        .map_err(|_| MarkerParseError::InvalidPayload {
            field: "fingerprint",
        })?;
    fingerprint
        .validate()
        .map_err(|_| MarkerParseError::InvalidPayload {
            field: "fingerprint",
        })?;

    let indexed_files = finite_count(raw, "indexedFiles")?;
    let total_chunks = finite_count(raw, "totalChunks")?;

    let completed_at_raw = non_empty_string(raw, "completedAt")?;
    let completed_at = DateTime::parse_from_rfc3339(&completed_at_raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| MarkerParseError::InvalidPayload {
            field: "completedAt",
        })?;

    let run_id = non_empty_string(raw, "runId")?;

    Ok(CompletionMarker {
        kind: kind.into(),
        codebase_path: codebase_path.into_boxed_str(),
        fingerprint,
        indexed_files,
        total_chunks,
        completed_at,
        run_id: run_id.into_boxed_str(),
    })
}

fn non_empty_string(raw: &Value, field: &'static str) -> Result<String, MarkerParseError> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(MarkerParseError::InvalidPayload { field })
}

fn finite_count(raw: &Value, field: &'static str) -> Result<u64, MarkerParseError> {
    let value = raw
        .get(field)
        .ok_or(MarkerParseError::InvalidPayload { field })?;

    if let Some(count) = value.as_u64() {
        return Ok(count);
    }

    // Older writers emit counts as floats; accept finite non-negative ones.
    value
        .as_f64()
        .filter(|count| count.is_finite() && *count >= 0.0)
        .map(|count| count as u64)
        .ok_or(MarkerParseError::InvalidPayload { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> IndexFingerprint {
        IndexFingerprint {
            embedding_provider: "voyageai".into(),
            embedding_model: "voyage-4-large".into(),
            embedding_dimension: 1024,
            vector_store_provider: "zilliz".into(),
            schema_version: "hybrid_v3".into(),
        }
    }

    fn valid_marker_json() -> Value {
        serde_json::json!({
            "kind": COMPLETION_MARKER_KIND,
            "codebasePath": "/repo",
            "fingerprint": {
                "embeddingProvider": "voyageai",
                "embeddingModel": "voyage-4-large",
                "embeddingDimension": 1024,
                "vectorStoreProvider": "zilliz",
                "schemaVersion": "hybrid_v3"
            },
            "indexedFiles": 128,
            "totalChunks": 4096,
            "completedAt": "2026-07-01T10:00:00Z",
            "runId": "run-1"
        })
    }

    #[test]
    fn valid_marker_parses() -> Result<(), MarkerParseError> {
        let marker = parse_completion_marker(&valid_marker_json())?;
        assert_eq!(marker.codebase_path.as_ref(), "/repo");
        assert_eq!(marker.indexed_files, 128);
        assert_eq!(marker.fingerprint, fingerprint());
        Ok(())
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let mut raw = valid_marker_json();
        raw["kind"] = Value::from("satori_index_completion_v0");
        assert_eq!(
            parse_completion_marker(&raw),
            Err(MarkerParseError::InvalidKind)
        );
    }

    #[test]
    fn non_finite_counts_are_invalid_payload() {
        let mut raw = valid_marker_json();
        raw["indexedFiles"] = Value::from("many");
        assert_eq!(
            parse_completion_marker(&raw),
            Err(MarkerParseError::InvalidPayload {
                field: "indexedFiles"
            })
        );
    }

    #[test]
    fn float_counts_from_older_writers_are_accepted() -> Result<(), MarkerParseError> {
        let mut raw = valid_marker_json();
        raw["totalChunks"] = Value::from(4096.0);
        let marker = parse_completion_marker(&raw)?;
        assert_eq!(marker.total_chunks, 4096);
        Ok(())
    }

    #[test]
    fn unparseable_timestamp_is_invalid_payload() {
        let mut raw = valid_marker_json();
        raw["completedAt"] = Value::from("yesterday");
        assert_eq!(
            parse_completion_marker(&raw),
            Err(MarkerParseError::InvalidPayload {
                field: "completedAt"
            })
        );
    }

    #[test]
    fn for_run_stamps_kind_and_run_id() {
        let marker = CompletionMarker::for_run("/repo", fingerprint(), 1, 2, Utc::now());
        assert_eq!(marker.kind.as_ref(), COMPLETION_MARKER_KIND);
        assert!(!marker.run_id.is_empty());
    }

    #[test]
    fn marker_round_trips_through_its_wire_shape() -> Result<(), Box<dyn std::error::Error>> {
        let marker = parse_completion_marker(&valid_marker_json()).map_err(Box::new)?;
        let value = serde_json::to_value(&marker)?;
        let reparsed = parse_completion_marker(&value).map_err(Box::new)?;
        assert_eq!(marker, reparsed);
        Ok(())
    }
}
