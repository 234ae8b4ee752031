//! Path canonicalization and classification.
//!
//! Two orthogonal classifications drive scoring and hints: `PathCategory`
//! (scoring multipliers) and `NoiseCategory` (noise-ratio hints).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Canonicalize a codebase root path.
///
/// Resolves through the filesystem when the path exists (realpath); falls
/// back to lexical absolutization otherwise. Trailing separators are trimmed
/// except at the filesystem root. The result is idempotent.
#[must_use]
pub fn canonicalize_root(path: &Path) -> PathBuf {
    let resolved = std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());

    // Rebuild from components: drops duplicate and trailing separators and
    // `.` segments, keeping the result stable under re-canonicalization.
    let mut out = PathBuf::new();
    for component in resolved.components() {
        match component {
            Component::CurDir => {},
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        resolved
    } else {
        out
    }
}

/// Canonical root rendered as the snapshot key string.
#[must_use]
pub fn canonical_root_string(path: &Path) -> String {
    canonicalize_root(path).to_string_lossy().into_owned()
}

/// Path category used for scoring multipliers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum PathCategory {
    /// Documentation trees and prose files.
    Docs,
    /// Test trees and test-suffixed files.
    Tests,
    /// Build output and generated artifacts.
    Generated,
    /// Entrypoint files (`main.*`, `index.*`, ...).
    Entrypoint,
    /// Core source (`src/core`, `core`).
    Core,
    /// General `src` runtime code.
    SrcRuntime,
    /// Anything else.
    Neutral,
    /// Test fixtures and sample data.
    Fixtures,
}

impl PathCategory {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docs => "docs",
            Self::Tests => "tests",
            Self::Generated => "generated",
            Self::Entrypoint => "entrypoint",
            Self::Core => "core",
            Self::SrcRuntime => "srcRuntime",
            Self::Neutral => "neutral",
            Self::Fixtures => "fixtures",
        }
    }
}

impl fmt::Display for PathCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Noise category used for the noise-ratio hint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NoiseCategory {
    /// Build output and generated artifacts.
    Generated,
    /// Test code.
    Tests,
    /// Test fixtures and sample data.
    Fixtures,
    /// Documentation.
    Docs,
    /// Everything else.
    Runtime,
}

impl NoiseCategory {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Tests => "tests",
            Self::Fixtures => "fixtures",
            Self::Docs => "docs",
            Self::Runtime => "runtime",
        }
    }

    /// True for categories counted toward the noise ratio.
    #[must_use]
    pub const fn is_noise(self) -> bool {
        !matches!(self, Self::Runtime)
    }
}

struct NormalizedPath {
    segments: Vec<String>,
    basename: String,
}

fn normalize(relative_path: &str) -> NormalizedPath {
    let lowered = relative_path.to_ascii_lowercase().replace('\\', "/");
    let segments: Vec<String> = lowered
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_owned)
        .collect();
    let basename = segments.last().cloned().unwrap_or_default();
    NormalizedPath { segments, basename }
}

fn has_segment(path: &NormalizedPath, names: &[&str]) -> bool {
    path.segments
        .iter()
        .any(|segment| names.contains(&segment.as_str()))
}

fn is_docs(path: &NormalizedPath) -> bool {
    has_segment(path, &["docs", "doc", "documentation", "guide", "guides"])
        || [".md", ".mdx", ".rst", ".adoc", ".txt"]
            .iter()
            .any(|suffix| path.basename.ends_with(suffix))
}

fn is_tests(path: &NormalizedPath) -> bool {
    has_segment(path, &["test", "tests", "__tests__"])
        || path.basename.contains(".test.")
        || path.basename.contains(".spec.")
}

fn is_fixtures(path: &NormalizedPath) -> bool {
    has_segment(path, &["fixtures", "__fixtures__", "testdata"])
}

fn is_generated(path: &NormalizedPath) -> bool {
    has_segment(path, &["dist", "build", "coverage", ".next", "generated"])
        || path.basename.ends_with(".min.js")
        || path.basename.ends_with(".min.css")
}

fn is_entrypoint(path: &NormalizedPath) -> bool {
    ["main.", "index.", "app.", "server.", "cli.", "entry."]
        .iter()
        .any(|prefix| path.basename.starts_with(prefix))
}

fn is_core(path: &NormalizedPath) -> bool {
    path.segments
        .windows(2)
        .any(|pair| pair[0] == "src" && pair[1] == "core")
        || has_segment(path, &["core"])
}

fn is_src(path: &NormalizedPath) -> bool {
    has_segment(path, &["src"])
}

/// Classify a relative path into its scoring category.
///
/// Decision order: docs, tests, fixtures, generated, entrypoint, core,
/// srcRuntime, neutral.
#[must_use]
pub fn classify_path(relative_path: &str) -> PathCategory {
    let path = normalize(relative_path);

    if is_docs(&path) {
        PathCategory::Docs
    } else if is_tests(&path) {
        PathCategory::Tests
    } else if is_fixtures(&path) {
        PathCategory::Fixtures
    } else if is_generated(&path) {
        PathCategory::Generated
    } else if is_entrypoint(&path) {
        PathCategory::Entrypoint
    } else if is_core(&path) {
        PathCategory::Core
    } else if is_src(&path) {
        PathCategory::SrcRuntime
    } else {
        PathCategory::Neutral
    }
}

/// Classify a relative path into its noise category.
///
/// Precedence: generated > tests > fixtures > docs > runtime.
#[must_use]
pub fn classify_noise(relative_path: &str) -> NoiseCategory {
    let path = normalize(relative_path);

    if is_generated(&path) {
        NoiseCategory::Generated
    } else if is_tests(&path) {
        NoiseCategory::Tests
    } else if is_fixtures(&path) {
        NoiseCategory::Fixtures
    } else if is_docs(&path) {
        NoiseCategory::Docs
    } else {
        NoiseCategory::Runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonicalization_is_idempotent_for_missing_paths() {
        let once = canonicalize_root(Path::new("/repo/sub//dir/"));
        let twice = canonicalize_root(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn trailing_separators_are_trimmed_except_at_root() {
        let canonical = canonical_root_string(Path::new("/repo/"));
        assert_eq!(canonical, "/repo");

        let root = canonical_root_string(Path::new("/"));
        assert_eq!(root, "/");
    }

    #[test]
    fn docs_win_over_tests_in_category_order() {
        assert_eq!(classify_path("docs/tests/setup.md"), PathCategory::Docs);
        assert_eq!(classify_path("guides/intro.ts"), PathCategory::Docs);
    }

    #[test]
    fn category_decision_order_matches_contract() {
        assert_eq!(classify_path("src/__tests__/runtime.ts"), PathCategory::Tests);
        assert_eq!(classify_path("src/api.spec.ts"), PathCategory::Tests);
        assert_eq!(classify_path("tests/fixtures/data.json"), PathCategory::Tests);
        assert_eq!(classify_path("fixtures/sample.ts"), PathCategory::Fixtures);
        assert_eq!(classify_path("dist/bundle.min.js"), PathCategory::Generated);
        assert_eq!(classify_path("src/main.ts"), PathCategory::Entrypoint);
        assert_eq!(classify_path("src/core/engine.ts"), PathCategory::Core);
        assert_eq!(classify_path("src/util/strings.ts"), PathCategory::SrcRuntime);
        assert_eq!(classify_path("scripts/release.sh"), PathCategory::Neutral);
    }

    #[test]
    fn noise_precedence_puts_generated_first() {
        assert_eq!(classify_noise("dist/tests/x.test.js"), NoiseCategory::Generated);
        assert_eq!(classify_noise("tests/fixtures/x.json"), NoiseCategory::Tests);
        assert_eq!(classify_noise("fixtures/readme.md"), NoiseCategory::Fixtures);
        assert_eq!(classify_noise("docs/intro.md"), NoiseCategory::Docs);
        assert_eq!(classify_noise("src/engine.rs"), NoiseCategory::Runtime);
    }

    #[test]
    fn classification_is_case_and_separator_insensitive() {
        assert_eq!(classify_path("DOCS\\Intro.MD"), PathCategory::Docs);
        assert_eq!(classify_noise("SRC\\Engine.RS"), NoiseCategory::Runtime);
    }

    proptest! {
        #[test]
        fn canonicalization_idempotence(raw in "/[a-z0-9/._-]{0,40}") {
            let once = canonicalize_root(Path::new(&raw));
            let twice = canonicalize_root(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
