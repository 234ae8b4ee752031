//! API v1 DTO types.

use satori_app::{Compatibility, DebugProofCheck, DebugSearch, FreshnessDecision, NoiseMitigationHint};
use satori_domain::{SearchGroup, SidecarEdge, SidecarNode, SidecarNote};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `manage_index` request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManageIndexRequestDto {
    /// Action: `create`, `reindex`, `sync`, `clear`, or `status`.
    pub action: String,
    /// Codebase path.
    pub path: String,
    /// Force a rebuild even when already indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    /// Explicit collection to drop before a reindex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zilliz_drop_collection: Option<String>,
    /// Extra file extensions to index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_extensions: Option<Vec<String>>,
    /// Extra ignore patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_patterns: Option<Vec<String>>,
}

/// `search_codebase` request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchCodebaseRequestDto {
    /// Codebase path.
    pub path: String,
    /// Query (operators + semantic text).
    pub query: String,
    /// Scope: `runtime`, `mixed`, or `docs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Result mode: `grouped` or `raw`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_mode: Option<String>,
    /// Grouping key: `symbol` or `file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Ranking mode: `default` or `auto_changed_first`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_mode: Option<String>,
    /// Maximum visible results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Attach the debug envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// `file_outline` request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileOutlineRequestDto {
    /// Codebase path.
    pub path: String,
    /// File to outline.
    pub file: String,
    /// Optional window start line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    /// Optional window end line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// Resolution mode: `outline` or `exact`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_mode: Option<String>,
    /// Exact symbol id filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_id_exact: Option<String>,
    /// Exact symbol label filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_label_exact: Option<String>,
    /// Maximum symbols returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_symbols: Option<u32>,
}

/// Symbol reference inside a `call_graph` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SymbolRefDto {
    /// File the symbol lives in.
    pub file: String,
    /// Symbol id.
    pub symbol_id: String,
    /// Optional label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_label: Option<String>,
    /// Optional span `[startLine, endLine]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<[u32; 2]>,
}

/// `call_graph` request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CallGraphRequestDto {
    /// Codebase path.
    pub path: String,
    /// Origin symbol.
    pub symbol_ref: SymbolRefDto,
    /// Direction: `callers`, `callees`, or `both`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Depth (clamped to `[1, 3]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    /// Maximum nodes returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// `manage_index` arguments embedded in action hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageArgsDto {
    /// Suggested action.
    pub action: String,
    /// Target path.
    pub path: String,
    /// Collection to drop first, when relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zilliz_drop_collection: Option<String>,
}

/// An actionable hint wrapping `manage_index` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionHintDto {
    /// The suggested tool arguments.
    pub args: ManageArgsDto,
}

/// Stale-local diagnostics hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleLocalHintDto {
    /// Why the completion proof failed.
    pub completion_proof: String,
}

/// Hints block attached to envelopes (`version: 1`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintsDto {
    /// Noise mitigation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_mitigation: Option<NoiseMitigationHint>,
    /// Debug envelope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_search: Option<DebugSearch>,
    /// Proof-probe diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_proof_check: Option<DebugProofCheck>,
    /// Suggested `create` call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<ActionHintDto>,
    /// Suggested `reindex` call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reindex: Option<ActionHintDto>,
    /// Stale-local diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_local: Option<StaleLocalHintDto>,
    /// Hints schema version.
    pub version: u32,
}

/// `search_codebase` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponseEnvelopeDto {
    /// `ok`, `not_indexed`, `not_ready`, or `requires_reindex`.
    pub status: String,
    /// Status-mirroring reason on non-ok envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Deduplicated, sorted warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Hints block.
    pub hints: HintsDto,
    /// Visible results.
    pub results: Vec<SearchGroup>,
    /// Compatibility block (always present on non-ok).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

/// `call_graph` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphEnvelopeDto {
    /// Envelope status.
    pub status: String,
    /// Status-mirroring reason on non-ok envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// True when the sidecar can answer queries for this origin.
    pub supported: bool,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Nodes reached (origin first).
    pub nodes: Vec<SidecarNode>,
    /// Edges traversed.
    pub edges: Vec<SidecarEdge>,
    /// Builder notes touching the returned files.
    pub notes: Vec<SidecarNote>,
    /// Deduplicated, sorted warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Hints block.
    pub hints: HintsDto,
    /// Compatibility block.
    pub compatibility: Compatibility,
}

/// `file_outline` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutlineEnvelopeDto {
    /// Envelope status.
    pub status: String,
    /// Status-mirroring reason on non-ok envelopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Matching symbols.
    pub symbols: Vec<SidecarNode>,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Deduplicated, sorted warnings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Hints block.
    pub hints: HintsDto,
    /// Compatibility block.
    pub compatibility: Compatibility,
}

/// `manage_index` response envelope (text payload plus hints).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageIndexEnvelopeDto {
    /// Stable outcome mode (`created`, `synced`, `blocked`, ...).
    pub mode: String,
    /// Human-readable outcome text.
    pub text: String,
    /// Freshness decision (sync only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness_decision: Option<FreshnessDecision>,
    /// Retry hint for blocked outcomes (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    /// Actionable hints.
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub hints: serde_json::Map<String, serde_json::Value>,
}
