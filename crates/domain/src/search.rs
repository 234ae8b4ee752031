//! Search vocabulary: scopes, candidates, groups, and the deterministic
//! ordering contract.

use crate::constants::{
    SEARCH_PROXIMITY_WINDOW, STALENESS_AGING_MS, STALENESS_FRESH_MS,
};
use crate::paths::PathCategory;
use crate::spans::{Language, LineSpan};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::fmt;

/// Search scope controlling inclusion and multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Runtime code only (docs and tests excluded).
    Runtime,
    /// Everything.
    Mixed,
    /// Docs and tests only.
    Docs,
}

impl SearchScope {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::Mixed => "mixed",
            Self::Docs => "docs",
        }
    }

    /// Scope inclusion rule over path categories.
    #[must_use]
    pub const fn includes(self, category: PathCategory) -> bool {
        match self {
            Self::Runtime => !matches!(category, PathCategory::Docs | PathCategory::Tests),
            Self::Mixed => true,
            Self::Docs => matches!(category, PathCategory::Docs | PathCategory::Tests),
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Result shaping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Grouped, diversity-capped results.
    Grouped,
    /// Raw top candidates.
    Raw,
}

/// Grouping key selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Group by symbol id (with hashed fallback ids).
    Symbol,
    /// Group by file.
    File,
}

/// Ranking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    /// Fusion scores only.
    Default,
    /// Boost VCS-dirty files when the dirty set is small enough.
    AutoChangedFirst,
}

/// Staleness bucket derived from a result's indexed-at age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalenessBucket {
    /// Indexed within the fresh window.
    Fresh,
    /// Indexed within the aging window.
    Aging,
    /// Older than the aging window.
    Stale,
    /// No indexed-at information.
    Unknown,
}

impl StalenessBucket {
    /// Bucket an age in milliseconds (`None` when unknown).
    #[must_use]
    pub const fn from_age_ms(age_ms: Option<u64>) -> Self {
        match age_ms {
            None => Self::Unknown,
            Some(age) if age < STALENESS_FRESH_MS => Self::Fresh,
            Some(age) if age < STALENESS_AGING_MS => Self::Aging,
            Some(_) => Self::Stale,
        }
    }
}

/// One scored chunk returned by a semantic pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkHit {
    /// Path relative to the codebase root (forward slashes).
    pub relative_path: Box<str>,
    /// Line span of the chunk.
    pub span: LineSpan,
    /// Language hint, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Chunk content.
    pub content: Box<str>,
    /// Symbol id covering the chunk, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<Box<str>>,
    /// Human-readable symbol label, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_label: Option<Box<str>>,
    /// When the chunk was indexed (epoch milliseconds), when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at_ms: Option<u64>,
    /// Native similarity score from the store.
    pub score: f32,
}

impl ChunkHit {
    /// Fusion key: identical chunks across passes fuse into one candidate.
    #[must_use]
    pub fn fusion_key(&self) -> (Box<str>, u32, u32, Option<Language>) {
        (
            self.relative_path.clone(),
            self.span.start_line(),
            self.span.end_line(),
            self.language,
        )
    }
}

/// Transient scored candidate flowing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    /// The underlying chunk hit.
    pub result: ChunkHit,
    /// Best native similarity across passes.
    pub base_score: f32,
    /// Accumulated RRF fusion score.
    pub fusion_score: f64,
    /// Fusion score after multipliers.
    pub final_score: f64,
    /// Scoring category of the path.
    pub path_category: PathCategory,
    /// Multiplier from the scope/category table.
    pub path_multiplier: f64,
    /// Changed-files boost applied to this candidate.
    pub changed_files_multiplier: f64,
    /// True when the candidate satisfied every `must` token.
    pub passes_matched_must: bool,
}

/// Call-graph availability hint attached to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphHint {
    /// True when the sidecar can answer graph queries for this group.
    pub supported: bool,
}

/// Fallback navigation target when call-graph data is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationFallback {
    /// File to open.
    pub file: Box<str>,
    /// Window start line.
    pub start_line: u32,
    /// Window end line.
    pub end_line: u32,
}

/// One grouped search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGroup {
    /// Stable group id (symbol id or hashed fallback).
    pub group_id: Box<str>,
    /// File the group lives in.
    pub file: Box<str>,
    /// Union span of the collapsed chunks.
    pub span: LineSpan,
    /// Language hint, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Symbol id, when the group is symbol-backed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<Box<str>>,
    /// Symbol label, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_label: Option<Box<str>>,
    /// Group score (best chunk, must-satisfied first).
    pub score: f64,
    /// Latest indexed-at across chunks (epoch milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at_ms: Option<u64>,
    /// Staleness bucket for `indexed_at_ms`.
    pub staleness_bucket: StalenessBucket,
    /// Number of chunks collapsed into the group.
    pub collapsed_chunk_count: usize,
    /// Call-graph availability hint.
    pub call_graph_hint: CallGraphHint,
    /// Fallback navigation when the graph is unsupported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_fallback: Option<NavigationFallback>,
    /// Preview text from the best chunk.
    pub preview: Box<str>,
}

/// Deterministic candidate ordering:
/// score desc, file asc, startLine asc, symbolLabel asc, symbolId asc,
/// language asc.
#[must_use]
pub fn compare_candidates(a: &SearchCandidate, b: &SearchCandidate) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| a.result.relative_path.cmp(&b.result.relative_path))
        .then_with(|| {
            a.result
                .span
                .start_line()
                .cmp(&b.result.span.start_line())
        })
        .then_with(|| a.result.symbol_label.cmp(&b.result.symbol_label))
        .then_with(|| a.result.symbol_id.cmp(&b.result.symbol_id))
        .then_with(|| language_key(a.result.language).cmp(&language_key(b.result.language)))
}

/// Deterministic group ordering (same chain as candidates).
#[must_use]
pub fn compare_groups(a: &SearchGroup, b: &SearchGroup) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.file.cmp(&b.file))
        .then_with(|| a.span.start_line().cmp(&b.span.start_line()))
        .then_with(|| a.symbol_label.cmp(&b.symbol_label))
        .then_with(|| a.symbol_id.cmp(&b.symbol_id))
        .then_with(|| language_key(a.language).cmp(&language_key(b.language)))
}

/// Lexical key for the trailing language tie-break.
const fn language_key(language: Option<Language>) -> Option<&'static str> {
    match language {
        Some(language) => Some(language.as_str()),
        None => None,
    }
}

/// Proximity bucket for fallback grouping within one file.
#[must_use]
pub const fn proximity_bucket(start_line: u32) -> u32 {
    (start_line.saturating_sub(1)) / SEARCH_PROXIMITY_WINDOW
}

/// Fallback group id when a chunk carries no symbol id:
/// `grp_<sha1(path:start-end)[0:16]>`.
#[must_use]
pub fn fallback_group_id(relative_path: &str, span: LineSpan) -> Box<str> {
    let mut hasher = Sha1::new();
    hasher.update(relative_path.as_bytes());
    hasher.update(b":");
    hasher.update(span.start_line().to_string().as_bytes());
    hasher.update(b"-");
    hasher.update(span.end_line().to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let prefix: String = digest.chars().take(16).collect();
    format!("grp_{prefix}").into_boxed_str()
}
