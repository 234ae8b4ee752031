//! `list_codebases` text formatter.
//!
//! Buckets render in the fixed order Ready, Indexing, Requires Reindex,
//! Failed; paths within a bucket sort lexicographically; indexing
//! percentages render with one decimal.

use satori_domain::{CodebaseEntry, CodebaseStatus};
use std::fmt::Write as _;

struct Buckets<'a> {
    ready: Vec<(&'a str, &'a CodebaseEntry)>,
    indexing: Vec<(&'a str, &'a CodebaseEntry)>,
    requires_reindex: Vec<(&'a str, &'a CodebaseEntry)>,
    failed: Vec<(&'a str, &'a CodebaseEntry)>,
}

/// Render the tracked codebases as markdown.
#[must_use]
pub fn format_list_codebases(entries: &[(String, CodebaseEntry)]) -> String {
    let mut buckets = Buckets {
        ready: Vec::new(),
        indexing: Vec::new(),
        requires_reindex: Vec::new(),
        failed: Vec::new(),
    };

    for (root, entry) in entries {
        match &entry.status {
            CodebaseStatus::Indexed { .. } | CodebaseStatus::SyncCompleted { .. } => {
                buckets.ready.push((root, entry));
            },
            CodebaseStatus::Indexing { .. } => buckets.indexing.push((root, entry)),
            CodebaseStatus::RequiresReindex { .. } => {
                buckets.requires_reindex.push((root, entry));
            },
            CodebaseStatus::IndexFailed { .. } => buckets.failed.push((root, entry)),
            CodebaseStatus::NotFound => {},
        }
    }

    for bucket in [
        &mut buckets.ready,
        &mut buckets.indexing,
        &mut buckets.requires_reindex,
        &mut buckets.failed,
    ] {
        bucket.sort_by(|(a, _), (b, _)| a.cmp(b));
    }

    let mut out = String::new();
    render_bucket(&mut out, "Ready", &buckets.ready);
    render_bucket(&mut out, "Indexing", &buckets.indexing);
    render_bucket(&mut out, "Requires Reindex", &buckets.requires_reindex);
    render_bucket(&mut out, "Failed", &buckets.failed);

    if out.is_empty() {
        out.push_str("No codebases are tracked.\n");
    }
    out
}

fn render_bucket(out: &mut String, heading: &str, entries: &[(&str, &CodebaseEntry)]) {
    if entries.is_empty() {
        return;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "### {heading}");
    for (root, entry) in entries {
        let _ = writeln!(out, "{}", entry_line(root, entry));
    }
}

fn entry_line(root: &str, entry: &CodebaseEntry) -> String {
    match &entry.status {
        CodebaseStatus::Indexed {
            indexed_files,
            total_chunks,
        } => format!("- {root} ({indexed_files} files, {total_chunks} chunks)"),
        CodebaseStatus::SyncCompleted {
            added,
            removed,
            modified,
        } => format!("- {root} (synced: +{added} -{removed} ~{modified})"),
        CodebaseStatus::Indexing {
            indexing_percentage,
        } => format!("- {root} ({indexing_percentage:.1}%)"),
        CodebaseStatus::RequiresReindex { message } => {
            let detail = entry
                .reindex_reason
                .as_deref()
                .unwrap_or(message.as_ref());
            format!("- {root} — {detail}")
        },
        CodebaseStatus::IndexFailed { error_message, .. } => {
            format!("- {root} — {error_message}")
        },
        CodebaseStatus::NotFound => format!("- {root}"),
    }
}
