//! `list`: render tracked codebases from the snapshot file.

use crate::error::CliError;
use crate::format::{OutputArgs, render};
use satori_api::v1::format_list_codebases;
use satori_app::SnapshotStore;
use satori_domain::CodebaseEntry;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    codebases: Vec<ListedCodebase>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedCodebase {
    root: String,
    #[serde(flatten)]
    entry: CodebaseEntry,
}

/// Execute `list`.
pub async fn run_list(output: OutputArgs, snapshot_path: &Path) -> Result<String, CliError> {
    let store = SnapshotStore::open(snapshot_path.to_path_buf());
    let entries = store.entries().await;

    let listing = Listing {
        codebases: entries
            .iter()
            .map(|(root, entry)| ListedCodebase {
                root: root.clone(),
                entry: entry.clone(),
            })
            .collect(),
    };

    render(output, &listing, |_| format_list_codebases(&entries)).map_err(CliError::from)
}
