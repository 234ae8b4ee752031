//! Call-graph and outline readers over the v3 sidecar.

use crate::deps::AppDeps;
use crate::gate::{Compatibility, GateDecision, GateStatus, OperationKind, check_readiness};
use crate::search::FreshnessDecision;
use satori_domain::{
    CALL_GRAPH_MAX_DEPTH, CallGraphSidecar, CodebaseEntry, EdgeKind, Language, LineSpan,
    NOTE_MISSING_SYMBOL_METADATA, SidecarEdge, SidecarNode,
};
use satori_shared::{ErrorCode, RequestContext, Result, read_json_if_exists};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

/// Warning: the sidecar reported unresolved symbol metadata.
pub const WARN_OUTLINE_MISSING_SYMBOL_METADATA: &str = "OUTLINE_MISSING_SYMBOL_METADATA";

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Symbols calling the origin.
    Callers,
    /// Symbols the origin calls.
    Callees,
    /// Both directions.
    Both,
}

impl Direction {
    const fn wants(self, kind: EdgeKind) -> bool {
        match self {
            Self::Callers => matches!(kind, EdgeKind::Callers),
            Self::Callees => matches!(kind, EdgeKind::Callees),
            Self::Both => true,
        }
    }
}

/// Reference to the symbol a graph query starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRef {
    /// File the symbol lives in.
    pub file: Box<str>,
    /// Symbol id.
    pub symbol_id: Box<str>,
    /// Optional label (diagnostic only).
    pub symbol_label: Option<Box<str>>,
    /// Optional span (diagnostic only).
    pub span: Option<LineSpan>,
}

/// `call_graph` request after argument validation.
#[derive(Debug, Clone)]
pub struct CallGraphRequest {
    /// Target codebase path.
    pub path: PathBuf,
    /// Origin symbol.
    pub symbol_ref: SymbolRef,
    /// Traversal direction.
    pub direction: Direction,
    /// Traversal depth (clamped to `[1, 3]`).
    pub depth: u32,
    /// Maximum nodes returned.
    pub limit: u32,
}

/// Envelope status for graph and outline responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStatus {
    /// Query answered.
    Ok,
    /// The origin symbol (or exact outline match) does not exist.
    NotFound,
    /// More than one exact outline match.
    Ambiguous,
    /// The file's language is not covered by the sidecar.
    Unsupported,
    /// No usable sidecar (or the index is building).
    NotReady,
    /// No index exists.
    NotIndexed,
    /// The index is incompatible with the runtime fingerprint.
    RequiresReindex,
}

impl GraphStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::Ambiguous => "ambiguous",
            Self::Unsupported => "unsupported",
            Self::NotReady => "not_ready",
            Self::NotIndexed => "not_indexed",
            Self::RequiresReindex => "requires_reindex",
        }
    }

    const fn from_gate(status: GateStatus) -> Self {
        match status {
            GateStatus::Ok => Self::Ok,
            GateStatus::NotIndexed => Self::NotIndexed,
            GateStatus::NotReady | GateStatus::Blocked => Self::NotReady,
            GateStatus::RequiresReindex => Self::RequiresReindex,
        }
    }
}

/// `call_graph` response envelope (pre-DTO).
#[derive(Debug, Clone, PartialEq)]
pub struct CallGraphResponse {
    /// Envelope status.
    pub status: GraphStatus,
    /// Status-mirroring reason on non-ok envelopes.
    pub reason: Option<Box<str>>,
    /// True when the sidecar can answer queries for this origin.
    pub supported: bool,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Nodes reached by the bounded walk (origin first).
    pub nodes: Vec<SidecarNode>,
    /// Edges traversed.
    pub edges: Vec<SidecarEdge>,
    /// Builder notes touching the returned files.
    pub notes: Vec<satori_domain::SidecarNote>,
    /// Deduplicated, sorted warnings.
    pub warnings: Vec<Box<str>>,
    /// True when a reindex would produce the sidecar.
    pub reindex_hint: bool,
    /// Compatibility block.
    pub compatibility: Compatibility,
}

/// Outline resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Windowed outline listing.
    Outline,
    /// Exact single-symbol resolution.
    Exact,
}

/// `file_outline` request after argument validation.
#[derive(Debug, Clone)]
pub struct FileOutlineRequest {
    /// Target codebase path.
    pub path: PathBuf,
    /// File to outline (relative, any separator).
    pub file: Box<str>,
    /// Optional window start line.
    pub start_line: Option<u32>,
    /// Optional window end line.
    pub end_line: Option<u32>,
    /// Resolution mode.
    pub resolve_mode: ResolveMode,
    /// Exact symbol id filter (`resolveMode=exact`).
    pub symbol_id_exact: Option<Box<str>>,
    /// Exact symbol label filter (`resolveMode=exact`).
    pub symbol_label_exact: Option<Box<str>>,
    /// Maximum symbols returned.
    pub limit_symbols: u32,
}

/// `file_outline` response envelope (pre-DTO).
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutlineResponse {
    /// Envelope status.
    pub status: GraphStatus,
    /// Status-mirroring reason on non-ok envelopes.
    pub reason: Option<Box<str>>,
    /// Matching symbols.
    pub symbols: Vec<SidecarNode>,
    /// Freshness decision.
    pub freshness_decision: FreshnessDecision,
    /// Deduplicated, sorted warnings.
    pub warnings: Vec<Box<str>>,
    /// True when a reindex would produce the sidecar.
    pub reindex_hint: bool,
    /// Compatibility block.
    pub compatibility: Compatibility,
}

enum SidecarLoad {
    Loaded(CallGraphSidecar),
    Missing,
}

fn load_sidecar(entry: Option<&CodebaseEntry>) -> Result<SidecarLoad> {
    let Some(pointer) = entry.and_then(|entry| entry.call_graph_sidecar.as_ref()) else {
        return Ok(SidecarLoad::Missing);
    };
    if pointer.version.as_ref() != satori_domain::SIDECAR_VERSION {
        return Ok(SidecarLoad::Missing);
    }

    match read_json_if_exists::<CallGraphSidecar>(Path::new(pointer.path.as_ref())) {
        Ok(Some(sidecar)) if sidecar.is_v3() => Ok(SidecarLoad::Loaded(sidecar)),
        Ok(_) => Ok(SidecarLoad::Missing),
        Err(error) if error.code == ErrorCode::not_found() => Ok(SidecarLoad::Missing),
        Err(error) => Err(error),
    }
}

fn normalize_file(file: &str) -> String {
    file.replace('\\', "/")
        .trim_start_matches("./")
        .to_ascii_lowercase()
}

fn file_matches(node_file: &str, wanted: &str) -> bool {
    normalize_file(node_file) == wanted
}

/// Execute a `call_graph` request.
pub async fn handle_call_graph(
    ctx: &RequestContext,
    deps: &AppDeps,
    request: CallGraphRequest,
) -> Result<CallGraphResponse> {
    ctx.checkpoint("call_graph.start")?;

    let decision = check_readiness(ctx, deps, &request.path, OperationKind::CallGraph).await?;
    if decision.status != GateStatus::Ok {
        return Ok(graph_envelope_from_gate(&decision));
    }

    let sidecar = match load_sidecar(decision.entry.as_ref())? {
        SidecarLoad::Loaded(sidecar) => sidecar,
        SidecarLoad::Missing => {
            let mut envelope = graph_envelope_from_gate(&decision);
            envelope.status = GraphStatus::NotReady;
            envelope.reason = Some("not_ready".into());
            envelope.supported = false;
            envelope.reindex_hint = true;
            return Ok(envelope);
        },
    };

    let origin = sidecar
        .nodes
        .iter()
        .find(|node| node.symbol_id == request.symbol_ref.symbol_id);

    let Some(origin) = origin else {
        let wanted_file = normalize_file(&request.symbol_ref.file);
        let file_has_nodes = sidecar
            .nodes
            .iter()
            .any(|node| file_matches(&node.file, &wanted_file));

        let (status, supported) = if file_has_nodes {
            (GraphStatus::NotFound, true)
        } else if language_unsupported(&sidecar, &request.symbol_ref.file) {
            (GraphStatus::Unsupported, false)
        } else {
            (GraphStatus::NotReady, false)
        };

        let mut envelope = graph_envelope_from_gate(&decision);
        envelope.status = status;
        envelope.reason = Some(status.as_str().into());
        envelope.supported = supported;
        return Ok(envelope);
    };

    let depth = request.depth.clamp(1, CALL_GRAPH_MAX_DEPTH);
    let limit = request.limit.max(1) as usize;
    let (nodes, edges) = walk(&sidecar, origin, request.direction, depth, limit);

    let mut warnings = BTreeSet::new();
    let missing = sidecar.missing_symbol_metadata_count();
    if missing > 0 {
        warnings.insert(
            format!("{WARN_OUTLINE_MISSING_SYMBOL_METADATA}:{missing}").into_boxed_str(),
        );
    }

    let involved_files: BTreeSet<String> = nodes
        .iter()
        .map(|node| normalize_file(&node.file))
        .collect();
    let notes = sidecar
        .notes
        .iter()
        .filter(|note| {
            note.file
                .as_deref()
                .is_none_or(|file| involved_files.contains(&normalize_file(file)))
        })
        .cloned()
        .collect();

    let mut envelope = graph_envelope_from_gate(&decision);
    envelope.status = GraphStatus::Ok;
    envelope.reason = None;
    envelope.supported = true;
    envelope.nodes = nodes;
    envelope.edges = edges;
    envelope.notes = notes;
    envelope.warnings = warnings.into_iter().collect();
    Ok(envelope)
}

fn graph_envelope_from_gate(decision: &GateDecision) -> CallGraphResponse {
    CallGraphResponse {
        status: GraphStatus::from_gate(decision.status),
        reason: decision.reason.clone(),
        supported: false,
        freshness_decision: FreshnessDecision::of(decision.status.freshness_mode()),
        nodes: Vec::new(),
        edges: Vec::new(),
        notes: Vec::new(),
        warnings: Vec::new(),
        reindex_hint: decision.hints.reindex,
        compatibility: decision.compatibility.clone(),
    }
}

fn language_unsupported(sidecar: &CallGraphSidecar, file: &str) -> bool {
    let extension = Path::new(file)
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or_default();
    let language = Language::from_extension(extension);

    language == Language::Text
        || !sidecar
            .nodes
            .iter()
            .any(|node| node.language == language)
}

/// Bounded BFS from the origin following direction-matching edges.
fn walk(
    sidecar: &CallGraphSidecar,
    origin: &SidecarNode,
    direction: Direction,
    depth: u32,
    limit: usize,
) -> (Vec<SidecarNode>, Vec<SidecarEdge>) {
    let mut visited: BTreeSet<Box<str>> = BTreeSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut queue: VecDeque<(Box<str>, u32)> = VecDeque::new();

    visited.insert(origin.symbol_id.clone());
    nodes.push(origin.clone());
    queue.push_back((origin.symbol_id.clone(), 0));

    while let Some((current, level)) = queue.pop_front() {
        if level >= depth {
            continue;
        }

        for edge in &sidecar.edges {
            if !direction.wants(edge.kind) || edge.src != current {
                continue;
            }

            edges.push(edge.clone());
            if visited.contains(&edge.dst) {
                continue;
            }
            if nodes.len() >= limit {
                continue;
            }

            if let Some(node) = sidecar
                .nodes
                .iter()
                .find(|node| node.symbol_id == edge.dst)
            {
                visited.insert(node.symbol_id.clone());
                nodes.push(node.clone());
                queue.push_back((node.symbol_id.clone(), level + 1));
            }
        }
    }

    edges.sort_by(|a, b| {
        a.src
            .cmp(&b.src)
            .then_with(|| a.dst.cmp(&b.dst))
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });
    edges.dedup();

    (nodes, edges)
}

/// Execute a `file_outline` request.
pub async fn handle_file_outline(
    ctx: &RequestContext,
    deps: &AppDeps,
    request: FileOutlineRequest,
) -> Result<FileOutlineResponse> {
    ctx.checkpoint("file_outline.start")?;

    let decision = check_readiness(ctx, deps, &request.path, OperationKind::FileOutline).await?;
    if decision.status != GateStatus::Ok {
        return Ok(outline_envelope_from_gate(&decision));
    }

    let sidecar = match load_sidecar(decision.entry.as_ref())? {
        SidecarLoad::Loaded(sidecar) => sidecar,
        SidecarLoad::Missing => {
            let mut envelope = outline_envelope_from_gate(&decision);
            envelope.status = GraphStatus::NotReady;
            envelope.reason = Some("not_ready".into());
            envelope.reindex_hint = true;
            return Ok(envelope);
        },
    };

    let wanted_file = normalize_file(&request.file);
    let mut symbols: Vec<SidecarNode> = sidecar
        .nodes
        .iter()
        .filter(|node| file_matches(&node.file, &wanted_file))
        .filter(|node| match (request.start_line, request.end_line) {
            (None, None) => true,
            (start, end) => node.span.overlaps_window(
                start.unwrap_or(1),
                end.unwrap_or(u32::MAX),
            ),
        })
        .cloned()
        .collect();

    symbols.sort_by(|a, b| {
        a.span
            .start_line()
            .cmp(&b.span.start_line())
            .then_with(|| a.symbol_id.cmp(&b.symbol_id))
    });

    if request.resolve_mode == ResolveMode::Exact {
        if let Some(symbol_id) = request.symbol_id_exact.as_deref() {
            symbols.retain(|node| node.symbol_id.as_ref() == symbol_id);
        }
        if let Some(label) = request.symbol_label_exact.as_deref() {
            symbols.retain(|node| node.symbol_label.as_deref() == Some(label));
        }
    }

    let mut warnings = BTreeSet::new();
    let missing = sidecar
        .notes
        .iter()
        .filter(|note| note.note_type.as_ref() == NOTE_MISSING_SYMBOL_METADATA)
        .filter(|note| {
            note.file
                .as_deref()
                .is_none_or(|file| file_matches(file, &wanted_file))
        })
        .count();
    if missing > 0 {
        warnings.insert(
            format!("{WARN_OUTLINE_MISSING_SYMBOL_METADATA}:{missing}").into_boxed_str(),
        );
    }

    let status = match (request.resolve_mode, symbols.len()) {
        (ResolveMode::Exact, 0) => GraphStatus::NotFound,
        (ResolveMode::Exact, 1) => GraphStatus::Ok,
        (ResolveMode::Exact, _) => GraphStatus::Ambiguous,
        (ResolveMode::Outline, _) => GraphStatus::Ok,
    };

    symbols.truncate(request.limit_symbols.max(1) as usize);

    let mut envelope = outline_envelope_from_gate(&decision);
    envelope.status = status;
    envelope.reason = (status != GraphStatus::Ok).then(|| Box::from(status.as_str()));
    envelope.symbols = symbols;
    envelope.warnings = warnings.into_iter().collect();
    Ok(envelope)
}

fn outline_envelope_from_gate(decision: &GateDecision) -> FileOutlineResponse {
    FileOutlineResponse {
        status: GraphStatus::from_gate(decision.status),
        reason: decision.reason.clone(),
        symbols: Vec::new(),
        freshness_decision: FreshnessDecision::of(decision.status.freshness_mode()),
        warnings: Vec::new(),
        reindex_hint: decision.hints.reindex,
        compatibility: decision.compatibility.clone(),
    }
}
