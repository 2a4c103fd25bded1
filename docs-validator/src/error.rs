//! Error and issue types for documentation validation.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Breaks routing, rendering or the quiz itself.
    Error,
    /// Suspicious but tolerated by the site generator.
    Warning,
}

impl Severity {
    /// Sort rank: errors come before warnings on the same line.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warning => 1,
        }
    }

    /// Whether this severity meets or exceeds `threshold`.
    #[must_use]
    pub fn is_at_least(self, threshold: Self) -> bool {
        self.rank() <= threshold.rank()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Classification of an issue. Not part of the serialized report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum IssueKind {
    /// Front matter missing, unterminated or not valid YAML.
    FrontMatterParse,
    /// Quiz block unterminated or a closing marker without an opening one.
    QuizParse,
    /// A required front-matter field is missing or has the wrong shape.
    Schema,
    /// A quiz question has a wrong number of options or correct answers.
    QuizStructure,
    /// A quiz question has no explanation.
    QuizExplanation,
    /// Fenced code block problems (unterminated fence, missing language tag).
    CodeBlock,
    /// The same canonical URL is declared more than once.
    DuplicateCanonical,
    /// Two documents in one section share a `nav_weight`.
    NavWeightCollision,
    /// An I/O error occurred while reading the file.
    Io,
    /// The file exceeded the configured maximum size limit.
    FileTooLarge,
    /// The file content is not valid UTF-8.
    InvalidEncoding,
    /// The resolved path is outside the scan root (symlink escape).
    OutsideRoot,
    /// A directory traversal error (permission denied, loop detected, etc.).
    WalkError,
    /// A resource limit (`max_files` or `max_total_bytes`) truncated the scan.
    LimitExceeded,
    /// The run was cancelled by its timeout before every file was validated.
    Incomplete,
}

impl IssueKind {
    /// Whether the issue means the file could not be validated at all.
    #[must_use]
    pub fn is_scan_failure(self) -> bool {
        matches!(
            self,
            Self::Io | Self::FileTooLarge | Self::InvalidEncoding | Self::OutsideRoot | Self::WalkError
        )
    }
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[non_exhaustive]
pub struct Issue {
    /// File the finding belongs to.
    pub file: PathBuf,
    /// Line number (1-indexed); 0 when the finding has no line.
    pub line: usize,
    /// Severity level.
    pub severity: Severity,
    /// Internal classification.
    #[serde(skip)]
    pub kind: IssueKind,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        severity: Severity,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            severity,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(
        file: impl Into<PathBuf>,
        line: usize,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, line, Severity::Error, kind, message)
    }

    #[must_use]
    pub fn warning(
        file: impl Into<PathBuf>,
        line: usize,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, line, Severity::Warning, kind, message)
    }

    /// Format the issue as `<file>:<line>: [<severity>] <message>`.
    #[must_use]
    pub fn format_human_readable(&self) -> String {
        format!(
            "{}:{}: [{}] {}",
            self.file.display(),
            self.line,
            self.severity,
            self.message
        )
    }

    /// Report ordering: file path, line, severity (errors first), message.
    #[must_use]
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then(self.line.cmp(&other.line))
            .then(self.severity.rank().cmp(&other.severity.rank()))
            .then_with(|| self.message.cmp(&other.message))
    }
}

/// A document-local parse failure. Converted into an [`Issue`] at the
/// document boundary; never aborts a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The file does not start with a `---` delimiter.
    #[error("missing front matter: first line must be '---'")]
    MissingFrontMatter,

    /// The opening `---` has no matching closing delimiter.
    #[error("unterminated front matter opened at line {line}")]
    UnterminatedFrontMatter { line: usize },

    /// The front-matter block is not valid YAML.
    #[error("invalid front matter YAML: {message}")]
    InvalidYaml { line: usize, message: String },

    /// The front-matter block parsed, but not into a key/value mapping.
    #[error("front matter must be a key/value mapping, found {found}")]
    NotAMapping { line: usize, found: &'static str },

    /// A quizdown block has no closing marker.
    #[error("unterminated quizdown block opened at line {line}")]
    UnterminatedQuiz { line: usize },

    /// A closing quizdown marker appeared without an open block.
    #[error("closing quizdown marker without a matching opening marker")]
    UnmatchedQuizClose { line: usize },
}

impl ParseError {
    /// Line the error points at (1-indexed).
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::MissingFrontMatter => 1,
            Self::UnterminatedFrontMatter { line }
            | Self::InvalidYaml { line, .. }
            | Self::NotAMapping { line, .. }
            | Self::UnterminatedQuiz { line }
            | Self::UnmatchedQuizClose { line } => *line,
        }
    }

    /// Convert into an error-severity issue for `file`.
    #[must_use]
    pub fn into_issue(self, file: impl Into<PathBuf>) -> Issue {
        let kind = match self {
            Self::UnterminatedQuiz { .. } | Self::UnmatchedQuizClose { .. } => {
                IssueKind::QuizParse
            }
            Self::MissingFrontMatter
            | Self::UnterminatedFrontMatter { .. }
            | Self::InvalidYaml { .. }
            | Self::NotAMapping { .. } => IssueKind::FrontMatterParse,
        };
        Issue::error(file, self.line(), kind, self.to_string())
    }
}

/// Unrecoverable conditions that abort the whole run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FatalError {
    #[error("no paths provided for validation")]
    NoPaths,

    #[error("path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("cannot read root {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude glob pattern '{pattern}': {message}")]
    InvalidExcludePattern { pattern: String, message: String },

    #[error("validation worker failed: {0}")]
    Worker(String),
}
