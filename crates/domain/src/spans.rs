//! Line spans and language identifiers.

use satori_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation failures for spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanError {
    /// Start/end must be >= 1.
    NonPositive {
        /// Starting line (1-indexed).
        start_line: u32,
        /// Ending line (1-indexed).
        end_line: u32,
    },
    /// Start must be <= end.
    StartAfterEnd {
        /// Starting line (1-indexed).
        start_line: u32,
        /// Ending line (1-indexed).
        end_line: u32,
    },
}

impl fmt::Display for SpanError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { .. } => {
                formatter.write_str("span startLine/endLine must be >= 1")
            },
            Self::StartAfterEnd { .. } => {
                formatter.write_str("span startLine must be <= endLine")
            },
        }
    }
}

impl std::error::Error for SpanError {}

impl From<SpanError> for ErrorEnvelope {
    fn from(error: SpanError) -> Self {
        let (SpanError::NonPositive {
            start_line,
            end_line,
        }
        | SpanError::StartAfterEnd {
            start_line,
            end_line,
        }) = error;

        Self::expected(ErrorCode::new("domain", "invalid_line_span"), error.to_string())
            .with_metadata("start_line", start_line.to_string())
            .with_metadata("end_line", end_line.to_string())
    }
}

/// Inclusive line span with 1-indexed boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSpan {
    start_line: u32,
    end_line: u32,
}

impl LineSpan {
    /// Construct a validated line span.
    pub const fn new(start_line: u32, end_line: u32) -> Result<Self, SpanError> {
        if start_line == 0 || end_line == 0 {
            return Err(SpanError::NonPositive {
                start_line,
                end_line,
            });
        }

        if start_line > end_line {
            return Err(SpanError::StartAfterEnd {
                start_line,
                end_line,
            });
        }

        Ok(Self {
            start_line,
            end_line,
        })
    }

    /// Returns the starting line (1-indexed).
    #[must_use]
    pub const fn start_line(&self) -> u32 {
        self.start_line
    }

    /// Returns the ending line (1-indexed).
    #[must_use]
    pub const fn end_line(&self) -> u32 {
        self.end_line
    }

    /// Smallest span covering both operands.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            start_line: self.start_line.min(other.start_line),
            end_line: self.end_line.max(other.end_line),
        }
    }

    /// True when `line` falls inside the span.
    #[must_use]
    pub const fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// True when the span intersects the inclusive `[start, end]` window.
    #[must_use]
    pub const fn overlaps_window(&self, start: u32, end: u32) -> bool {
        self.start_line <= end && self.end_line >= start
    }
}

/// Canonical language identifiers derived from file extensions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// `TypeScript` source files.
    TypeScript,
    /// `JavaScript` source files.
    JavaScript,
    /// `Python` source files.
    Python,
    /// `Java` source files.
    Java,
    /// `Cpp` source files.
    Cpp,
    /// `C` source files.
    C,
    /// `CSharp` source files.
    CSharp,
    /// `Go` source files.
    Go,
    /// `Rust` source files.
    Rust,
    /// `Php` source files.
    Php,
    /// `Ruby` source files.
    Ruby,
    /// `Swift` source files.
    Swift,
    /// `Kotlin` source files.
    Kotlin,
    /// `Markdown` documents.
    Markdown,
    /// `Text` fallback.
    Text,
}

impl Language {
    /// Returns the canonical string identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::CSharp => "csharp",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Markdown => "markdown",
            Self::Text => "text",
        }
    }

    /// Parse a canonical language identifier.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "typescript" => Some(Self::TypeScript),
            "javascript" => Some(Self::JavaScript),
            "python" => Some(Self::Python),
            "java" => Some(Self::Java),
            "cpp" => Some(Self::Cpp),
            "c" => Some(Self::C),
            "csharp" => Some(Self::CSharp),
            "go" => Some(Self::Go),
            "rust" => Some(Self::Rust),
            "php" => Some(Self::Php),
            "ruby" => Some(Self::Ruby),
            "swift" => Some(Self::Swift),
            "kotlin" => Some(Self::Kotlin),
            "markdown" => Some(Self::Markdown),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Derive a language identifier from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        let trimmed = extension.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            return Self::Text;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "ts" | "tsx" => Self::TypeScript,
            "js" | "jsx" | "mjs" => Self::JavaScript,
            "py" => Self::Python,
            "java" => Self::Java,
            "cpp" | "hpp" | "cc" => Self::Cpp,
            "c" | "h" => Self::C,
            "cs" => Self::CSharp,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "php" => Self::Php,
            "rb" => Self::Ruby,
            "swift" => Self::Swift,
            "kt" => Self::Kotlin,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
