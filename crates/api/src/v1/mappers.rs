//! Mapping from query-core responses to wire envelopes.

use crate::v1::types::{
    ActionHintDto, CallGraphEnvelopeDto, FileOutlineEnvelopeDto, HintsDto, ManageArgsDto,
    ManageIndexEnvelopeDto, SearchResponseEnvelopeDto, StaleLocalHintDto,
};
use satori_app::{
    CallGraphResponse, FileOutlineResponse, GateHints, GateStatus, ManageOutcome, SearchResponse,
};

/// Hints schema version.
pub const HINTS_VERSION: u32 = 1;

fn action_hint(action: &str, path: &str) -> ActionHintDto {
    ActionHintDto {
        args: ManageArgsDto {
            action: action.to_owned(),
            path: path.to_owned(),
            zilliz_drop_collection: None,
        },
    }
}

fn hints_from_gate(gate_hints: &GateHints, path: &str) -> HintsDto {
    HintsDto {
        noise_mitigation: None,
        debug_search: None,
        debug_proof_check: None,
        create: gate_hints.create.then(|| action_hint("create", path)),
        reindex: gate_hints.reindex.then(|| action_hint("reindex", path)),
        stale_local: gate_hints.stale_local.map(|reason| StaleLocalHintDto {
            completion_proof: reason.as_str().to_owned(),
        }),
        version: HINTS_VERSION,
    }
}

/// Map a search response to its envelope.
#[must_use]
pub fn search_envelope(response: SearchResponse, request_path: &str) -> SearchResponseEnvelopeDto {
    let hint_path = response
        .effective_root
        .as_deref()
        .unwrap_or(request_path)
        .to_owned();

    let mut hints = hints_from_gate(&response.gate_hints, &hint_path);
    hints.noise_mitigation = response.hints.noise_mitigation;
    hints.debug_search = response.hints.debug_search;
    hints.debug_proof_check = response.hints.debug_proof_check;

    let ok = response.status == GateStatus::Ok;
    SearchResponseEnvelopeDto {
        status: response.status.as_str().to_owned(),
        reason: response.reason.map(|reason| reason.into_string()),
        freshness_decision: response.freshness_decision,
        warnings: response
            .warnings
            .into_iter()
            .map(|item| item.into_string())
            .collect(),
        hints,
        results: response.results,
        compatibility: (!ok).then_some(response.compatibility),
    }
}

/// Map a call-graph response to its envelope.
#[must_use]
pub fn call_graph_envelope(
    response: CallGraphResponse,
    request_path: &str,
) -> CallGraphEnvelopeDto {
    let gate_hints = GateHints {
        create: false,
        reindex: response.reindex_hint,
        stale_local: None,
    };

    CallGraphEnvelopeDto {
        status: response.status.as_str().to_owned(),
        reason: response.reason.map(|reason| reason.into_string()),
        supported: response.supported,
        freshness_decision: response.freshness_decision,
        nodes: response.nodes,
        edges: response.edges,
        notes: response.notes,
        warnings: response
            .warnings
            .into_iter()
            .map(|item| item.into_string())
            .collect(),
        hints: hints_from_gate(&gate_hints, request_path),
        compatibility: response.compatibility,
    }
}

/// Map a file-outline response to its envelope.
#[must_use]
pub fn file_outline_envelope(
    response: FileOutlineResponse,
    request_path: &str,
) -> FileOutlineEnvelopeDto {
    let gate_hints = GateHints {
        create: false,
        reindex: response.reindex_hint,
        stale_local: None,
    };

    FileOutlineEnvelopeDto {
        status: response.status.as_str().to_owned(),
        reason: response.reason.map(|reason| reason.into_string()),
        symbols: response.symbols,
        freshness_decision: response.freshness_decision,
        warnings: response
            .warnings
            .into_iter()
            .map(|item| item.into_string())
            .collect(),
        hints: hints_from_gate(&gate_hints, request_path),
        compatibility: response.compatibility,
    }
}

/// Map a manage outcome to its envelope.
#[must_use]
pub fn manage_envelope(outcome: ManageOutcome) -> ManageIndexEnvelopeDto {
    let mut hints = serde_json::Map::new();
    for (key, value) in outcome.hints {
        hints.insert(key.into_string(), value);
    }

    ManageIndexEnvelopeDto {
        mode: outcome.mode.into_string(),
        text: outcome.message,
        freshness_decision: outcome.freshness_decision,
        retry_after_ms: outcome.retry_after_ms,
        hints,
    }
}
