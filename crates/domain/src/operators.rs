//! Query operator parsing.
//!
//! Operators live in the prefix block of the query: the substring up to the
//! first blank line or `SEARCH_OPERATOR_PREFIX_MAX_CHARS`, whichever comes
//! first. Tokenization respects double quotes and backslash escapes.

use crate::constants::SEARCH_OPERATOR_PREFIX_MAX_CHARS;
use serde::{Deserialize, Serialize};

/// Parsed query: operator lists plus the remaining semantic text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// Semantic query text after operator extraction.
    pub semantic_query: Box<str>,
    /// `lang:` allow-list (lowercased).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lang: Vec<Box<str>>,
    /// `path:` include patterns (forward-slashed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_includes: Vec<Box<str>>,
    /// `-path:` exclude patterns (forward-slashed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_excludes: Vec<Box<str>>,
    /// `must:` tokens (AND semantics across fields).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Box<str>>,
    /// `exclude:` tokens (ANY semantics across fields).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Box<str>>,
}

impl ParsedQuery {
    /// True when any operator list is non-empty.
    #[must_use]
    pub fn has_operators(&self) -> bool {
        !self.lang.is_empty()
            || !self.path_includes.is_empty()
            || !self.path_excludes.is_empty()
            || !self.must.is_empty()
            || !self.exclude.is_empty()
    }

    /// True when `must:` operators are present.
    #[must_use]
    pub fn has_must(&self) -> bool {
        !self.must.is_empty()
    }
}

/// Parse the query prefix into operators and semantic text.
#[must_use]
pub fn parse_query(query: &str) -> ParsedQuery {
    let (prefix, suffix) = split_prefix_block(query);
    let tokens = tokenize(prefix);

    let mut parsed = ParsedQuery::default();
    let mut semantic_tokens: Vec<String> = Vec::new();

    for token in tokens {
        match token {
            Token::Escaped(text) => semantic_tokens.push(text),
            Token::Plain(text) => match split_operator(&text) {
                Some((key, value)) => apply_operator(&mut parsed, key, value),
                None => semantic_tokens.push(text),
            },
        }
    }

    let mut semantic = semantic_tokens.join(" ");
    let suffix = suffix.trim();
    if !suffix.is_empty() {
        if !semantic.is_empty() {
            semantic.push(' ');
        }
        semantic.push_str(suffix);
    }

    if !parsed.has_operators() {
        // Operator-free queries pass through verbatim (modulo trim).
        semantic = query.trim().to_owned();
    }

    parsed.semantic_query = semantic.into_boxed_str();
    parsed
}

/// Split the query into the operator prefix block and the remaining suffix.
fn split_prefix_block(query: &str) -> (&str, &str) {
    let blank = query.find("\n\n");
    let cap = floor_char_boundary(query, SEARCH_OPERATOR_PREFIX_MAX_CHARS);

    match blank {
        Some(index) if index < cap => {
            let suffix = query.get(index + 2..).unwrap_or("");
            (query.get(..index).unwrap_or(""), suffix)
        },
        _ => (
            query.get(..cap).unwrap_or(query),
            query.get(cap..).unwrap_or(""),
        ),
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut boundary = index;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

enum Token {
    /// Token that started with `\`: always semantic.
    Escaped(String),
    /// Ordinary token, possibly an operator.
    Plain(String),
}

/// Whitespace-separated tokens; double quotes group, backslash escapes.
fn tokenize(prefix: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut leading_backslash = false;
    let mut started = false;

    let mut chars = prefix.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if !started {
                    // `\token` keeps the token semantic with the prefix stripped.
                    started = true;
                    leading_backslash = true;
                    continue;
                }
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                } else {
                    current.push('\\');
                }
            },
            '"' => {
                started = true;
                in_quotes = !in_quotes;
            },
            ch if ch.is_whitespace() && !in_quotes => {
                if started && !current.is_empty() {
                    tokens.push(finish_token(&mut current, leading_backslash));
                }
                started = false;
                leading_backslash = false;
            },
            ch => {
                started = true;
                current.push(ch);
            },
        }
    }

    if started && !current.is_empty() {
        tokens.push(finish_token(&mut current, leading_backslash));
    }

    tokens
}

fn finish_token(current: &mut String, escaped: bool) -> Token {
    let text = std::mem::take(current);
    if escaped {
        Token::Escaped(text)
    } else {
        Token::Plain(text)
    }
}

fn split_operator(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once(':')?;
    if value.is_empty() {
        return None;
    }
    match key {
        "lang" | "path" | "-path" | "must" | "exclude" => Some((key, value)),
        _ => None,
    }
}

fn apply_operator(parsed: &mut ParsedQuery, key: &str, value: &str) {
    match key {
        "lang" => parsed
            .lang
            .push(value.to_ascii_lowercase().into_boxed_str()),
        "path" => parsed.path_includes.push(normalize_slashes(value)),
        "-path" => parsed.path_excludes.push(normalize_slashes(value)),
        "must" => parsed.must.push(value.to_owned().into_boxed_str()),
        "exclude" => parsed.exclude.push(value.to_owned().into_boxed_str()),
        _ => {},
    }
}

fn normalize_slashes(value: &str) -> Box<str> {
    value.replace('\\', "/").into_boxed_str()
}
