//! `validate`: check a tool request payload without executing it.

use crate::error::CliError;
use crate::format::{OutputArgs, render};
use satori_api::v1::{
    CallGraphRequestDto, FileOutlineRequestDto, ManageIndexRequestDto, SearchCodebaseRequestDto,
    validate_call_graph, validate_file_outline, validate_manage_index, validate_search_codebase,
};
use serde::Serialize;

/// Tool request kinds accepted by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RequestKind {
    /// `manage_index` arguments.
    ManageIndex,
    /// `search_codebase` arguments.
    SearchCodebase,
    /// `file_outline` arguments.
    FileOutline,
    /// `call_graph` arguments.
    CallGraph,
}

/// Validation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationVerdict {
    /// True when the payload validated.
    pub ok: bool,
    /// The request kind checked.
    pub kind: String,
    /// Failure detail, when invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Execute `validate`.
pub fn run_validate(
    output: OutputArgs,
    kind: RequestKind,
    payload: &str,
) -> Result<String, CliError> {
    let error = match kind {
        RequestKind::ManageIndex => check::<ManageIndexRequestDto, _>(payload, |dto| {
            validate_manage_index(dto).map(|_| ())
        }),
        RequestKind::SearchCodebase => check::<SearchCodebaseRequestDto, _>(payload, |dto| {
            validate_search_codebase(dto).map(|_| ())
        }),
        RequestKind::FileOutline => check::<FileOutlineRequestDto, _>(payload, |dto| {
            validate_file_outline(dto).map(|_| ())
        }),
        RequestKind::CallGraph => check::<CallGraphRequestDto, _>(payload, |dto| {
            validate_call_graph(dto).map(|_| ())
        }),
    };

    let verdict = ValidationVerdict {
        ok: error.is_none(),
        kind: format!("{kind:?}"),
        error,
    };

    render(output, &verdict, |verdict| {
        if verdict.ok {
            "request is valid\n".to_owned()
        } else {
            format!(
                "request is invalid: {}\n",
                verdict.error.as_deref().unwrap_or("unknown")
            )
        }
    })
    .map_err(CliError::from)
}

fn check<T, F>(payload: &str, validate: F) -> Option<String>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(&T) -> Result<(), satori_api::v1::RequestValidationError>,
{
    let dto: T = match serde_json::from_str(payload) {
        Ok(dto) => dto,
        Err(error) => return Some(error.to_string()),
    };
    validate(&dto).err().map(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: OutputArgs = OutputArgs { json: true };

    #[test]
    fn valid_search_payload_passes() -> Result<(), CliError> {
        let rendered = run_validate(
            OUTPUT,
            RequestKind::SearchCodebase,
            r#"{ "path": "/repo", "query": "run", "scope": "runtime" }"#,
        )?;
        assert!(rendered.contains("\"ok\": true"));
        Ok(())
    }

    #[test]
    fn unknown_scope_fails() -> Result<(), CliError> {
        let rendered = run_validate(
            OUTPUT,
            RequestKind::SearchCodebase,
            r#"{ "path": "/repo", "query": "run", "scope": "everything" }"#,
        )?;
        assert!(rendered.contains("\"ok\": false"));
        assert!(rendered.contains("unknown value"));
        Ok(())
    }

    #[test]
    fn unknown_fields_fail() -> Result<(), CliError> {
        let rendered = run_validate(
            OUTPUT,
            RequestKind::ManageIndex,
            r#"{ "action": "create", "path": "/repo", "surprise": 1 }"#,
        )?;
        assert!(rendered.contains("\"ok\": false"));
        Ok(())
    }
}
