//! Call-graph sidecar (v3) document types.
//!
//! The sidecar is an immutable per-codebase artifact rebuilt whole after a
//! full index and incrementally after sync deltas. The core only reads it.

use crate::fingerprint::IndexFingerprint;
use crate::spans::{Language, LineSpan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Note type reported when the builder could not resolve symbol metadata.
pub const NOTE_MISSING_SYMBOL_METADATA: &str = "missing_symbol_metadata";

/// Edge direction in the call graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// `src` is called by `dst`.
    Callers,
    /// `src` calls `dst`.
    Callees,
}

impl EdgeKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Callers => "callers",
            Self::Callees => "callees",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// One symbol node in the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarNode {
    /// Stable symbol id.
    pub symbol_id: Box<str>,
    /// Human-readable label, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_label: Option<Box<str>>,
    /// File the symbol lives in (relative, forward slashes).
    pub file: Box<str>,
    /// Symbol span.
    pub span: LineSpan,
    /// Source language.
    pub language: Language,
}

/// One directed edge in the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarEdge {
    /// Source symbol id.
    pub src: Box<str>,
    /// Destination symbol id.
    pub dst: Box<str>,
    /// Edge direction.
    pub kind: EdgeKind,
}

/// Builder note attached to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarNote {
    /// Note type (e.g. `missing_symbol_metadata`).
    #[serde(rename = "type")]
    pub note_type: Box<str>,
    /// Affected file, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<Box<str>>,
    /// Free-form details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<str>>,
}

/// The v3 sidecar document as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphSidecar {
    /// Format version tag.
    pub version: Box<str>,
    /// Build timestamp.
    pub built_at: DateTime<Utc>,
    /// Fingerprint of the index the sidecar was built against.
    pub fingerprint: IndexFingerprint,
    /// Node count (redundant with `nodes.len()`, kept for cheap pointers).
    pub node_count: u64,
    /// Edge count.
    pub edge_count: u64,
    /// Note count.
    pub note_count: u64,
    /// Symbol nodes.
    pub nodes: Vec<SidecarNode>,
    /// Directed edges.
    pub edges: Vec<SidecarEdge>,
    /// Builder notes.
    pub notes: Vec<SidecarNote>,
}

impl CallGraphSidecar {
    /// True when this document is the version the core reads.
    #[must_use]
    pub fn is_v3(&self) -> bool {
        self.version.as_ref() == crate::constants::SIDECAR_VERSION
    }

    /// Number of `missing_symbol_metadata` notes.
    #[must_use]
    pub fn missing_symbol_metadata_count(&self) -> usize {
        self.notes
            .iter()
            .filter(|note| note.note_type.as_ref() == NOTE_MISSING_SYMBOL_METADATA)
            .count()
    }
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

    #[test]
    fn sidecar_wire_shape_matches_contract() -> Result<(), Box<dyn std::error::Error>> {
        let sidecar = CallGraphSidecar {
            version: "v3".into(),
            built_at: "2026-07-01T10:00:00Z".parse()?,
            fingerprint: fingerprint(),
            node_count: 1,
            edge_count: 1,
            note_count: 1,
            nodes: vec![SidecarNode {
                symbol_id: "sym_run".into(),
                symbol_label: Some("run".into()),
                file: "src/runtime.ts".into(),
                span: LineSpan::new(1, 20).map_err(|e| e.to_string())?,
                language: Language::TypeScript,
            }],
            edges: vec![SidecarEdge {
                src: "sym_run".into(),
                dst: "sym_exec".into(),
                kind: EdgeKind::Callees,
            }],
            notes: vec![SidecarNote {
                note_type: NOTE_MISSING_SYMBOL_METADATA.into(),
                file: Some("src/vendor.ts".into()),
                details: None,
            }],
        };

        let value = serde_json::to_value(&sidecar)?;
        assert_eq!(value["version"], "v3");
        assert_eq!(value["nodes"][0]["symbolId"], "sym_run");
        assert_eq!(value["edges"][0]["kind"], "callees");
        assert_eq!(value["notes"][0]["type"], NOTE_MISSING_SYMBOL_METADATA);

        let reparsed: CallGraphSidecar = serde_json::from_value(value)?;
        assert!(reparsed.is_v3());
        assert_eq!(reparsed.missing_symbol_metadata_count(), 1);
        Ok(())
    }
}
