//! Candidate filtering in fixed order: scope, lang, path includes, path
//! excludes, `must` (AND), `exclude` (ANY).

use globset::{Glob, GlobSet, GlobSetBuilder};
use satori_domain::{ParsedQuery, SearchCandidate, SearchScope};
use satori_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;

/// Per-reason removal counts for the debug summary.
pub type RemovalCounts = BTreeMap<Box<str>, usize>;

/// Compiled path operator matchers.
pub struct PathMatchers {
    includes: Option<GlobSet>,
    excludes: Option<GlobSet>,
}

impl PathMatchers {
    /// Compile `path:` / `-path:` patterns into glob sets.
    pub fn compile(parsed: &ParsedQuery) -> Result<Self> {
        Ok(Self {
            includes: build_glob_set(&parsed.path_includes)?,
            excludes: build_glob_set(&parsed.path_excludes)?,
        })
    }
}

/// Build an any-of glob set with gitignore-style reach.
///
/// A bare pattern matches at any depth and as a directory prefix, so
/// `src/core` matches `src/core/engine.ts` and `packages/a/src/core/x.ts`.
fn build_glob_set(patterns: &[Box<str>]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        for variant in pattern_variants(pattern) {
            let glob = Glob::new(&variant).map_err(|error| {
                ErrorEnvelope::expected(
                    ErrorCode::new("search", "invalid_path_pattern"),
                    error.to_string(),
                )
                .with_metadata("pattern", pattern.to_string())
            })?;
            builder.add(glob);
        }
    }

    let set = builder.build().map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("search", "invalid_path_pattern"),
            error.to_string(),
        )
    })?;
    Ok(Some(set))
}

fn pattern_variants(pattern: &str) -> Vec<String> {
    let trimmed = pattern.trim_matches('/');
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

/// Apply all filters, counting removals by reason.
#[must_use]
pub fn apply_filters(
    candidates: Vec<SearchCandidate>,
    scope: SearchScope,
    parsed: &ParsedQuery,
    matchers: &PathMatchers,
) -> (Vec<SearchCandidate>, RemovalCounts) {
    let mut removals = RemovalCounts::new();
    let has_must = parsed.has_must();

    let survivors = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            if !scope.includes(candidate.path_category) {
                count(&mut removals, "scope");
                return None;
            }

            if !lang_allowed(&candidate, parsed) {
                count(&mut removals, "lang");
                return None;
            }

            if let Some(includes) = matchers.includes.as_ref()
                && !includes.is_match(candidate.result.relative_path.as_ref())
            {
                count(&mut removals, "path");
                return None;
            }

            if let Some(excludes) = matchers.excludes.as_ref()
                && excludes.is_match(candidate.result.relative_path.as_ref())
            {
                count(&mut removals, "-path");
                return None;
            }

            if has_must {
                if !matches_all_must(&candidate, parsed) {
                    count(&mut removals, "must");
                    return None;
                }
                candidate.passes_matched_must = true;
            }

            if matches_any_exclude(&candidate, parsed) {
                count(&mut removals, "exclude");
                return None;
            }

            Some(candidate)
        })
        .collect();

    (survivors, removals)
}

fn count(removals: &mut RemovalCounts, reason: &str) {
    *removals.entry(Box::from(reason)).or_insert(0) += 1;
}

fn lang_allowed(candidate: &SearchCandidate, parsed: &ParsedQuery) -> bool {
    if parsed.lang.is_empty() {
        return true;
    }

    candidate
        .result
        .language
        .map(|language| language.as_str())
        .is_some_and(|language| parsed.lang.iter().any(|allow| allow.as_ref() == language))
}

/// Field set searched by `must` / `exclude`: symbolLabel, relativePath,
/// content. Matching is case-insensitive.
fn candidate_matches_token(candidate: &SearchCandidate, token: &str) -> bool {
    let needle = token.to_ascii_lowercase();
    let label = candidate
        .result
        .symbol_label
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let path = candidate.result.relative_path.to_ascii_lowercase();
    let content = candidate.result.content.to_ascii_lowercase();

    label.contains(&needle) || path.contains(&needle) || content.contains(&needle)
}

fn matches_all_must(candidate: &SearchCandidate, parsed: &ParsedQuery) -> bool {
    parsed
        .must
        .iter()
        .all(|token| candidate_matches_token(candidate, token))
}

fn matches_any_exclude(candidate: &SearchCandidate, parsed: &ParsedQuery) -> bool {
    parsed
        .exclude
        .iter()
        .any(|token| candidate_matches_token(candidate, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_domain::{ChunkHit, Language, LineSpan, classify_path, parse_query};

    fn candidate(path: &str, language: Option<Language>, content: &str) -> SearchCandidate {
        #[allow(clippy::unwrap_used, reason = "statically valid span")]
        let span = LineSpan::new(1, 4).unwrap();
        SearchCandidate {
            result: ChunkHit {
                relative_path: path.into(),
                span,
                language,
                content: content.into(),
                symbol_id: None,
                symbol_label: Some("runLoop".into()),
                indexed_at_ms: None,
                score: 0.5,
            },
            base_score: 0.5,
            fusion_score: 0.1,
            final_score: 0.1,
            path_category: classify_path(path),
            path_multiplier: 1.0,
            changed_files_multiplier: 1.0,
            passes_matched_must: false,
        }
    }

    fn run(
        query: &str,
        scope: SearchScope,
        candidates: Vec<SearchCandidate>,
    ) -> (Vec<SearchCandidate>, RemovalCounts) {
        let parsed = parse_query(query);
        let matchers = match PathMatchers::compile(&parsed) {
            Ok(matchers) => matchers,
            Err(_) => {
                return (Vec::new(), RemovalCounts::new());
            },
        };
        apply_filters(candidates, scope, &parsed, &matchers)
    }

    #[test]
    fn runtime_scope_drops_docs_and_tests() {
        let (survivors, removals) = run(
            "query",
            SearchScope::Runtime,
            vec![
                candidate("docs/guide.md", None, "guide"),
                candidate("src/lib.rs", Some(Language::Rust), "fn lib"),
                candidate("tests/api.rs", Some(Language::Rust), "test"),
            ],
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(removals.get("scope").copied(), Some(2));
    }

    #[test]
    fn lang_allow_list_filters_candidates() {
        let (survivors, removals) = run(
            "lang:rust query",
            SearchScope::Mixed,
            vec![
                candidate("src/lib.rs", Some(Language::Rust), "fn lib"),
                candidate("src/app.ts", Some(Language::TypeScript), "const app"),
                candidate("src/unknown.xyz", None, "???"),
            ],
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(removals.get("lang").copied(), Some(2));
    }

    #[test]
    fn path_patterns_match_gitignore_style() {
        let (survivors, _) = run(
            "path:src/core query",
            SearchScope::Mixed,
            vec![
                candidate("src/core/engine.rs", Some(Language::Rust), "engine"),
                candidate("packages/a/src/core/x.rs", Some(Language::Rust), "x"),
                candidate("src/util/strings.rs", Some(Language::Rust), "strings"),
            ],
        );
        let paths: Vec<&str> = survivors
            .iter()
            .map(|candidate| candidate.result.relative_path.as_ref())
            .collect();
        assert_eq!(paths, vec!["src/core/engine.rs", "packages/a/src/core/x.rs"]);
    }

    #[test]
    fn exclude_paths_remove_matches() {
        let (survivors, removals) = run(
            "-path:generated query",
            SearchScope::Mixed,
            vec![
                candidate("src/generated/api.rs", Some(Language::Rust), "api"),
                candidate("src/lib.rs", Some(Language::Rust), "lib"),
            ],
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(removals.get("-path").copied(), Some(1));
    }

    #[test]
    fn must_is_an_and_across_fields() {
        let (survivors, _) = run(
            "must:runloop must:engine query",
            SearchScope::Mixed,
            vec![
                // symbolLabel matches runLoop; content matches engine.
                candidate("src/a.rs", Some(Language::Rust), "engine start"),
                // only one token matches.
                candidate("src/b.rs", Some(Language::Rust), "engine start b"),
            ],
        );
        // Both match runLoop via symbol label; both match engine via content.
        assert_eq!(survivors.len(), 2);
        assert!(survivors.iter().all(|candidate| candidate.passes_matched_must));

        let (survivors, removals) = run(
            "must:nonexistent query",
            SearchScope::Mixed,
            vec![candidate("src/a.rs", Some(Language::Rust), "engine")],
        );
        assert!(survivors.is_empty());
        assert_eq!(removals.get("must").copied(), Some(1));
    }

    #[test]
    fn exclude_is_an_any_across_fields() {
        let (survivors, removals) = run(
            "exclude:mock query",
            SearchScope::Mixed,
            vec![
                candidate("src/mock_helper.rs", Some(Language::Rust), "helper"),
                candidate("src/real.rs", Some(Language::Rust), "uses a MockServer"),
                candidate("src/clean.rs", Some(Language::Rust), "clean"),
            ],
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(removals.get("exclude").copied(), Some(2));
    }
}
