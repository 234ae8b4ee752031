//! `status`: report the tracked state of one codebase.

use crate::error::CliError;
use crate::format::{OutputArgs, render};
use satori_app::SnapshotStore;
use satori_domain::{CodebaseEntry, canonical_root_string};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    root: String,
    tracked: bool,
    #[serde(flatten)]
    entry: Option<CodebaseEntry>,
}

/// Execute `status`.
pub async fn run_status(
    output: OutputArgs,
    snapshot_path: &Path,
    codebase: &Path,
) -> Result<String, CliError> {
    let store = SnapshotStore::open(snapshot_path.to_path_buf());
    let root = canonical_root_string(codebase);
    let entry = store.get(&root).await;

    let report = StatusReport {
        root: root.clone(),
        tracked: entry.is_some(),
        entry,
    };

    render(output, &report, |report| {
        report.entry.as_ref().map_or_else(
            || format!("{root} is not tracked\n"),
            |entry| {
                format!(
                    "{root}: {} (fingerprint: {})\n",
                    entry.status.as_str(),
                    entry
                        .index_fingerprint
                        .as_ref()
                        .map_or_else(|| "unknown".to_owned(), ToString::to_string),
                )
            },
        )
    })
    .map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::CodebaseStatus;

    #[tokio::test]
    async fn untracked_roots_report_as_such() -> Result<(), CliError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snapshot.json");

        let rendered = run_status(
            OutputArgs { json: false },
            &path,
            Path::new("/does-not-exist"),
        )
        .await?;
        assert!(rendered.contains("not tracked"));
        Ok(())
    }

    #[tokio::test]
    async fn tracked_roots_report_their_status() -> Result<(), CliError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snapshot.json");
        let store = SnapshotStore::open(path.clone());
        store
            .set_status(
                "/repo",
                CodebaseStatus::Indexed {
                    indexed_files: 1,
                    total_chunks: 2,
                },
                1,
            )
            .await
            .map_err(CliError::from)?;

        let rendered = run_status(OutputArgs { json: false }, &path, Path::new("/repo")).await?;
        assert!(rendered.contains("indexed"));
        Ok(())
    }
}
