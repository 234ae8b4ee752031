//! Strict request validation: DTOs collapse into the typed requests of the
//! query core, and unknown enum strings are terminal errors.

use crate::v1::types::{
    CallGraphRequestDto, FileOutlineRequestDto, ManageIndexRequestDto, SearchCodebaseRequestDto,
};
use satori_app::{
    CallGraphRequest, Direction, FileOutlineRequest, ManageAction, ManageRequest, ResolveMode,
    SearchRequest, SymbolRef,
};
use satori_domain::{GroupBy, LineSpan, RankingMode, ResultMode, SearchScope};
use satori_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;
use std::path::PathBuf;

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;
const DEFAULT_OUTLINE_SYMBOLS: u32 = 100;
const DEFAULT_GRAPH_DEPTH: u32 = 1;
const DEFAULT_GRAPH_LIMIT: u32 = 25;

/// Typed validation failures for tool requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestValidationError {
    /// A required string field is empty.
    EmptyField {
        /// Field name as it appears on the wire.
        field: &'static str,
    },
    /// An enum field holds an unknown string.
    UnknownEnumValue {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A numeric field is out of range.
    OutOfRange {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Offending value.
        value: u32,
    },
    /// The request body failed to deserialize.
    Malformed {
        /// Deserializer message.
        detail: String,
    },
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyField { field } => write!(formatter, "{field} must be non-empty"),
            Self::UnknownEnumValue { field, value } => {
                write!(formatter, "{field} holds an unknown value: {value}")
            },
            Self::OutOfRange { field, value } => {
                write!(formatter, "{field} is out of range: {value}")
            },
            Self::Malformed { detail } => write!(formatter, "malformed request: {detail}"),
        }
    }
}

impl std::error::Error for RequestValidationError {}

impl From<RequestValidationError> for ErrorEnvelope {
    fn from(error: RequestValidationError) -> Self {
        Self::expected(ErrorCode::new("api", "invalid_request"), error.to_string())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, RequestValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RequestValidationError::EmptyField { field });
    }
    Ok(trimmed.to_owned())
}

fn parse_enum<T>(
    field: &'static str,
    value: Option<&str>,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RequestValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => parse(raw).ok_or_else(|| RequestValidationError::UnknownEnumValue {
            field,
            value: raw.to_owned(),
        }),
    }
}

/// Validate a `manage_index` request.
pub fn validate_manage_index(
    dto: &ManageIndexRequestDto,
) -> Result<ManageRequest, RequestValidationError> {
    let action = match dto.action.trim() {
        "create" => ManageAction::Create,
        "reindex" => ManageAction::Reindex,
        "sync" => ManageAction::Sync,
        "clear" => ManageAction::Clear,
        "status" => ManageAction::Status,
        other => {
            return Err(RequestValidationError::UnknownEnumValue {
                field: "action",
                value: other.to_owned(),
            });
        },
    };

    let path = required("path", &dto.path)?;

    Ok(ManageRequest {
        action,
        path: PathBuf::from(path),
        force: dto.force.unwrap_or(false),
        zilliz_drop_collection: dto
            .zilliz_drop_collection
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned),
        custom_extensions: collect_trimmed(dto.custom_extensions.as_deref()),
        ignore_patterns: collect_trimmed(dto.ignore_patterns.as_deref()),
    })
}

/// Validate a `search_codebase` request.
pub fn validate_search_codebase(
    dto: &SearchCodebaseRequestDto,
) -> Result<SearchRequest, RequestValidationError> {
    let path = required("path", &dto.path)?;
    let query = required("query", &dto.query)?;

    let scope = parse_enum("scope", dto.scope.as_deref(), SearchScope::Mixed, |raw| {
        match raw {
            "runtime" => Some(SearchScope::Runtime),
            "mixed" => Some(SearchScope::Mixed),
            "docs" => Some(SearchScope::Docs),
            _ => None,
        }
    })?;
    let result_mode = parse_enum(
        "resultMode",
        dto.result_mode.as_deref(),
        ResultMode::Grouped,
        |raw| match raw {
            "grouped" => Some(ResultMode::Grouped),
            "raw" => Some(ResultMode::Raw),
            _ => None,
        },
    )?;
    let group_by = parse_enum("groupBy", dto.group_by.as_deref(), GroupBy::Symbol, |raw| {
        match raw {
            "symbol" => Some(GroupBy::Symbol),
            "file" => Some(GroupBy::File),
            _ => None,
        }
    })?;
    let ranking_mode = parse_enum(
        "rankingMode",
        dto.ranking_mode.as_deref(),
        RankingMode::Default,
        |raw| match raw {
            "default" => Some(RankingMode::Default),
            "auto_changed_first" => Some(RankingMode::AutoChangedFirst),
            _ => None,
        },
    )?;

    let limit = dto.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(RequestValidationError::OutOfRange {
            field: "limit",
            value: limit,
        });
    }

    Ok(SearchRequest {
        path: PathBuf::from(path),
        query,
        scope,
        result_mode,
        group_by,
        ranking_mode,
        limit,
        debug: dto.debug.unwrap_or(false),
    })
}

/// Validate a `file_outline` request.
pub fn validate_file_outline(
    dto: &FileOutlineRequestDto,
) -> Result<FileOutlineRequest, RequestValidationError> {
    let path = required("path", &dto.path)?;
    let file = required("file", &dto.file)?;

    let resolve_mode = parse_enum(
        "resolveMode",
        dto.resolve_mode.as_deref(),
        ResolveMode::Outline,
        |raw| match raw {
            "outline" => Some(ResolveMode::Outline),
            "exact" => Some(ResolveMode::Exact),
            _ => None,
        },
    )?;

    if let (Some(start), Some(end)) = (dto.start_line, dto.end_line)
        && (start == 0 || start > end)
    {
        return Err(RequestValidationError::OutOfRange {
            field: "startLine",
            value: start,
        });
    }

    Ok(FileOutlineRequest {
        path: PathBuf::from(path),
        file: file.into_boxed_str(),
        start_line: dto.start_line,
        end_line: dto.end_line,
        resolve_mode,
        symbol_id_exact: non_empty_boxed(dto.symbol_id_exact.as_deref()),
        symbol_label_exact: non_empty_boxed(dto.symbol_label_exact.as_deref()),
        limit_symbols: dto.limit_symbols.unwrap_or(DEFAULT_OUTLINE_SYMBOLS).max(1),
    })
}

/// Validate a `call_graph` request.
pub fn validate_call_graph(
    dto: &CallGraphRequestDto,
) -> Result<CallGraphRequest, RequestValidationError> {
    let path = required("path", &dto.path)?;
    let file = required("symbolRef.file", &dto.symbol_ref.file)?;
    let symbol_id = required("symbolRef.symbolId", &dto.symbol_ref.symbol_id)?;

    let direction = parse_enum(
        "direction",
        dto.direction.as_deref(),
        Direction::Both,
        |raw| match raw {
            "callers" => Some(Direction::Callers),
            "callees" => Some(Direction::Callees),
            "both" => Some(Direction::Both),
            _ => None,
        },
    )?;

    let depth = dto.depth.unwrap_or(DEFAULT_GRAPH_DEPTH);
    if !(1..=satori_domain::CALL_GRAPH_MAX_DEPTH).contains(&depth) {
        return Err(RequestValidationError::OutOfRange {
            field: "depth",
            value: depth,
        });
    }

    let span = match dto.symbol_ref.span {
        None => None,
        Some([start, end]) => Some(LineSpan::new(start, end).map_err(|_| {
            RequestValidationError::OutOfRange {
                field: "symbolRef.span",
                value: start,
            }
        })?),
    };

    Ok(CallGraphRequest {
        path: PathBuf::from(path),
        symbol_ref: SymbolRef {
            file: file.into_boxed_str(),
            symbol_id: symbol_id.into_boxed_str(),
            symbol_label: non_empty_boxed(dto.symbol_ref.symbol_label.as_deref()),
            span,
        },
        direction,
        depth,
        limit: dto.limit.unwrap_or(DEFAULT_GRAPH_LIMIT).max(1),
    })
}

fn collect_trimmed(values: Option<&[String]>) -> Vec<Box<str>> {
    values
        .unwrap_or_default()
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(Box::from)
        .collect()
}

fn non_empty_boxed(value: Option<&str>) -> Option<Box<str>> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Box::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_dto() -> SearchCodebaseRequestDto {
        SearchCodebaseRequestDto {
            path: "/repo".to_owned(),
            query: "run".to_owned(),
            scope: Some("runtime".to_owned()),
            result_mode: Some("grouped".to_owned()),
            group_by: Some("symbol".to_owned()),
            ranking_mode: Some("auto_changed_first".to_owned()),
            limit: Some(5),
            debug: None,
        }
    }

    #[test]
    fn valid_search_request_collapses_to_typed_enums() -> Result<(), RequestValidationError> {
        let request = validate_search_codebase(&search_dto())?;
        assert_eq!(request.scope, SearchScope::Runtime);
        assert_eq!(request.ranking_mode, RankingMode::AutoChangedFirst);
        assert_eq!(request.limit, 5);
        Ok(())
    }

    #[test]
    fn unknown_enum_strings_fail_validation() {
        let mut dto = search_dto();
        dto.scope = Some("everything".to_owned());
        assert!(matches!(
            validate_search_codebase(&dto),
            Err(RequestValidationError::UnknownEnumValue { field: "scope", .. })
        ));
    }

    #[test]
    fn absent_enums_take_defaults() -> Result<(), RequestValidationError> {
        let dto = SearchCodebaseRequestDto {
            scope: None,
            result_mode: None,
            group_by: None,
            ranking_mode: None,
            limit: None,
            ..search_dto()
        };
        let request = validate_search_codebase(&dto)?;
        assert_eq!(request.scope, SearchScope::Mixed);
        assert_eq!(request.limit, DEFAULT_SEARCH_LIMIT);
        Ok(())
    }

    #[test]
    fn zero_and_oversized_limits_are_rejected() {
        for limit in [0, MAX_SEARCH_LIMIT + 1] {
            let mut dto = search_dto();
            dto.limit = Some(limit);
            assert!(matches!(
                validate_search_codebase(&dto),
                Err(RequestValidationError::OutOfRange { field: "limit", .. })
            ));
        }
    }

    #[test]
    fn empty_required_fields_are_rejected() {
        let mut dto = search_dto();
        dto.query = "   ".to_owned();
        assert!(matches!(
            validate_search_codebase(&dto),
            Err(RequestValidationError::EmptyField { field: "query" })
        ));
    }

    #[test]
    fn unknown_manage_actions_are_rejected() {
        let dto = ManageIndexRequestDto {
            action: "rebuild".to_owned(),
            path: "/repo".to_owned(),
            force: None,
            zilliz_drop_collection: None,
            custom_extensions: None,
            ignore_patterns: None,
        };
        assert!(matches!(
            validate_manage_index(&dto),
            Err(RequestValidationError::UnknownEnumValue { field: "action", .. })
        ));
    }

    #[test]
    fn call_graph_depth_is_bounded() {
        let dto = CallGraphRequestDto {
            path: "/repo".to_owned(),
            symbol_ref: crate::v1::types::SymbolRefDto {
                file: "src/a.ts".to_owned(),
                symbol_id: "sym_a".to_owned(),
                symbol_label: None,
                span: None,
            },
            direction: Some("both".to_owned()),
            depth: Some(4),
            limit: None,
        };
        assert!(matches!(
            validate_call_graph(&dto),
            Err(RequestValidationError::OutOfRange { field: "depth", .. })
        ));
    }

    #[test]
    fn unknown_request_fields_fail_deserialization() {
        let raw = serde_json::json!({
            "path": "/repo",
            "query": "run",
            "surprise": true
        });
        let parsed: Result<SearchCodebaseRequestDto, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn outline_window_must_be_ordered() {
        let dto = FileOutlineRequestDto {
            path: "/repo".to_owned(),
            file: "src/a.ts".to_owned(),
            start_line: Some(10),
            end_line: Some(5),
            resolve_mode: None,
            symbol_id_exact: None,
            symbol_label_exact: None,
            limit_symbols: None,
        };
        assert!(validate_file_outline(&dto).is_err());
    }
}
