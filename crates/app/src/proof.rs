//! Completion-proof validation.
//!
//! Probes the cloud-side marker document and classifies the result. The
//! validator never mutates the snapshot; callers decide what to do with the
//! outcome.

use satori_domain::{
    CompletionMarker, IndexFingerprint, MarkerParseError, canonical_root_string,
    parse_completion_marker,
};
use satori_ports::ContextPort;
use satori_shared::RequestContext;
use std::fmt;
use std::path::Path;

/// Why the local snapshot's readiness claim is not backed by proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleLocalReason {
    /// No marker document exists.
    MissingMarkerDoc,
    /// The document exists but its `kind` tag is wrong.
    InvalidMarkerKind,
    /// The marker names a different codebase path.
    PathMismatch,
    /// A marker field is missing or malformed.
    InvalidPayload,
}

impl StaleLocalReason {
    /// Wire representation used in hints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingMarkerDoc => "missing_marker_doc",
            Self::InvalidMarkerKind => "invalid_marker_kind",
            Self::PathMismatch => "path_mismatch",
            Self::InvalidPayload => "invalid_payload",
        }
    }
}

impl fmt::Display for StaleLocalReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Outcome of a completion-proof probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProofOutcome {
    /// Proof present and consistent with the runtime fingerprint.
    Valid(CompletionMarker),
    /// The snapshot claims readiness but the proof is absent or malformed.
    StaleLocal(StaleLocalReason),
    /// Proof exists but was built under a different fingerprint.
    FingerprintMismatch {
        /// The fingerprint recorded in the marker.
        indexed: IndexFingerprint,
    },
    /// The probe itself failed (transport); local status is kept.
    ProbeFailed,
}

/// Probe and classify the completion marker for `canonical_root`.
pub async fn validate_completion_proof(
    ctx: &RequestContext,
    context: &dyn ContextPort,
    canonical_root: &Path,
    runtime_fingerprint: &IndexFingerprint,
) -> ProofOutcome {
    let raw = match context.get_index_completion_marker(ctx, canonical_root).await {
        Ok(raw) => raw,
        Err(_) => return ProofOutcome::ProbeFailed,
    };

    let Some(raw) = raw else {
        return ProofOutcome::StaleLocal(StaleLocalReason::MissingMarkerDoc);
    };

    let marker = match parse_completion_marker(&raw) {
        Ok(marker) => marker,
        Err(MarkerParseError::InvalidKind) => {
            return ProofOutcome::StaleLocal(StaleLocalReason::InvalidMarkerKind);
        },
        Err(MarkerParseError::InvalidPayload { .. }) => {
            return ProofOutcome::StaleLocal(StaleLocalReason::InvalidPayload);
        },
    };

    // Canonicalize both sides: older writers did not canonicalize the path
    // they recorded.
    let expected = canonical_root_string(canonical_root);
    let recorded = canonical_root_string(Path::new(marker.codebase_path.as_ref()));
    if expected != recorded {
        return ProofOutcome::StaleLocal(StaleLocalReason::PathMismatch);
    }

    if !marker.fingerprint.matches(runtime_fingerprint) {
        return ProofOutcome::FingerprintMismatch {
            indexed: marker.fingerprint,
        };
    }

    ProofOutcome::Valid(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_ports::BoxFuture;
    use satori_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
    use serde_json::Value;

    struct MarkerProbe {
        response: Result<Option<Value>>,
    }

    impl ContextPort for MarkerProbe {
        fn resolve_collection_name(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<satori_domain::CollectionName>> {
            Box::pin(async {
                satori_domain::CollectionName::parse("code_chunks_test").map_err(Into::into)
            })
        }

        fn index_codebase(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
            _custom_extensions: Vec<Box<str>>,
            _ignore_patterns: Vec<Box<str>>,
            _on_progress: Option<Box<satori_ports::ProgressFn>>,
        ) -> BoxFuture<'_, Result<satori_ports::IndexOutcome>> {
            Box::pin(async {
                Ok(satori_ports::IndexOutcome {
                    indexed_files: 0,
                    total_chunks: 0,
                })
            })
        }

        fn reindex_by_change(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<satori_ports::SyncDelta>> {
            Box::pin(async {
                Ok(satori_ports::SyncDelta {
                    added: 0,
                    removed: 0,
                    modified: 0,
                })
            })
        }

        fn clear_index(&self, _ctx: &RequestContext, _root: &Path) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn get_index_completion_marker(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<Option<Value>>> {
            let response = self.response.clone();
            Box::pin(async move { response })
        }

        fn write_index_completion_marker(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
            _marker: CompletionMarker,
        ) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn clear_index_completion_marker(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn get_active_ignore_patterns(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn get_tracked_relative_paths(
            &self,
            _ctx: &RequestContext,
            _root: &Path,
        ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn runtime_fingerprint() -> IndexFingerprint {
        IndexFingerprint {
            embedding_provider: "voyageai".into(),
            embedding_model: "voyage-4-large".into(),
            embedding_dimension: 1024,
            vector_store_provider: "zilliz".into(),
            schema_version: "hybrid_v3".into(),
        }
    }

    fn marker_json(model: &str, path: &str) -> Value {
        serde_json::json!({
            "kind": "satori_index_completion_v1",
            "codebasePath": path,
            "fingerprint": {
                "embeddingProvider": "voyageai",
                "embeddingModel": model,
                "embeddingDimension": 1024,
                "vectorStoreProvider": "zilliz",
                "schemaVersion": "hybrid_v3"
            },
            "indexedFiles": 10,
            "totalChunks": 100,
            "completedAt": "2026-07-01T10:00:00Z",
            "runId": "run-1"
        })
    }

    #[tokio::test]
    async fn missing_marker_is_stale_local() {
        let probe = MarkerProbe { response: Ok(None) };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert_eq!(
            outcome,
            ProofOutcome::StaleLocal(StaleLocalReason::MissingMarkerDoc)
        );
    }

    #[tokio::test]
    async fn wrong_kind_is_stale_local() {
        let mut raw = marker_json("voyage-4-large", "/repo");
        raw["kind"] = Value::from("other_doc");
        let probe = MarkerProbe {
            response: Ok(Some(raw)),
        };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert_eq!(
            outcome,
            ProofOutcome::StaleLocal(StaleLocalReason::InvalidMarkerKind)
        );
    }

    #[tokio::test]
    async fn path_mismatch_is_stale_local() {
        let probe = MarkerProbe {
            response: Ok(Some(marker_json("voyage-4-large", "/other"))),
        };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert_eq!(
            outcome,
            ProofOutcome::StaleLocal(StaleLocalReason::PathMismatch)
        );
    }

    #[tokio::test]
    async fn non_canonical_recorded_path_still_validates() {
        let probe = MarkerProbe {
            response: Ok(Some(marker_json("voyage-4-large", "/repo/"))),
        };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert!(matches!(outcome, ProofOutcome::Valid(_)));
    }

    #[tokio::test]
    async fn fingerprint_difference_is_a_mismatch() {
        let probe = MarkerProbe {
            response: Ok(Some(marker_json("voyage-3", "/repo"))),
        };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert!(matches!(
            outcome,
            ProofOutcome::FingerprintMismatch { indexed }
                if indexed.embedding_model.as_ref() == "voyage-3"
        ));
    }

    #[tokio::test]
    async fn transport_error_is_probe_failed() {
        let probe = MarkerProbe {
            response: Err(ErrorEnvelope::unexpected(
                ErrorCode::transport(),
                "store unreachable",
                ErrorClass::Retriable,
            )),
        };
        let outcome = validate_completion_proof(
            &RequestContext::new_request(),
            &probe,
            Path::new("/repo"),
            &runtime_fingerprint(),
        )
        .await;
        assert_eq!(outcome, ProofOutcome::ProbeFailed);
    }
}
