//! Configuration types for documentation validation.
//!
//! Split into core validation config (what a well-formed document looks
//! like) and source-specific config (how files are discovered, read and
//! scheduled). The core API does not leak filesystem concerns.

use std::path::PathBuf;
use std::time::Duration;

/// Front-matter fields every document must declare by default.
pub const DEFAULT_REQUIRED_FIELDS: &[&str] =
    &["title", "canonical", "tags", "date", "type", "nav_weight"];

/// Accepted values of the `type` field by default.
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &["docs"];

/// File extensions scanned by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// Host matching policy for `canonical` URLs.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub enum DomainPolicy {
    /// Accept any host (only the URL shape is checked).
    #[default]
    Any,
    /// Every canonical URL must use this exact host.
    MustMatch(String),
    /// Every canonical URL must use one of the listed hosts.
    AllowList(Vec<String>),
}

impl DomainPolicy {
    /// Build a policy from a list of hosts: none means any, one means
    /// must-match, several means allow-list.
    #[must_use]
    pub fn from_hosts(mut hosts: Vec<String>) -> Self {
        match hosts.len() {
            0 => Self::Any,
            1 => Self::MustMatch(hosts.remove(0)),
            _ => Self::AllowList(hosts),
        }
    }

    /// Whether `host` is accepted by this policy (case-insensitive).
    #[must_use]
    pub fn accepts(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::MustMatch(expected) => expected.eq_ignore_ascii_case(host),
            Self::AllowList(allowed) => allowed.iter().any(|a| a.eq_ignore_ascii_case(host)),
        }
    }

    /// Human-readable description used in issue messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any domain".to_owned(),
            Self::MustMatch(expected) => format!("'{expected}'"),
            Self::AllowList(allowed) => format!("one of [{}]", allowed.join(", ")),
        }
    }
}

/// Core validation config, applies regardless of input source.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ValidationConfig {
    /// Front-matter keys that must be present in every document.
    pub required_fields: Vec<String>,
    /// Accepted values of the `type` field.
    pub allowed_types: Vec<String>,
    /// Host policy for `canonical` URLs.
    pub domain_policy: DomainPolicy,
    /// Allow quiz questions with several correct options.
    ///
    /// When `false` (default) a question must have exactly one `[x]`.
    pub allow_multi_select: bool,
    /// Warn about fenced code blocks without a language tag.
    pub require_code_language: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_fields: DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|f| (*f).to_owned())
                .collect(),
            allowed_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            domain_policy: DomainPolicy::Any,
            allow_multi_select: false,
            require_code_language: false,
        }
    }
}

/// Filesystem-specific source options.
///
/// NOTE: `paths` is required and must be non-empty. Default content roots
/// are a CLI/wrapper concern, not baked into the library.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct FsSourceConfig {
    /// Paths to scan (files or directories). Required, must be non-empty.
    pub paths: Vec<PathBuf>,
    /// Exclude patterns (glob format).
    pub exclude: Vec<String>,
    /// File extensions to scan, without the leading dot.
    pub extensions: Vec<String>,
    /// Maximum file size in bytes (default: 10 MB).
    pub max_file_size: u64,
    /// Whether to follow symbolic links (default: `false`).
    pub follow_links: bool,
    /// Maximum directory traversal depth (default: 64).
    pub max_depth: usize,
    /// Maximum total number of files to scan (default: `100_000`).
    pub max_files: usize,
    /// Maximum total bytes to read across all files (default: 512 MB).
    pub max_total_bytes: u64,
    /// Number of parsing workers; 0 means one per available CPU core.
    pub jobs: usize,
    /// Global deadline for the run. Files not reached in time are
    /// reported as not validated and the report is marked incomplete.
    pub timeout: Option<Duration>,
}

impl FsSourceConfig {
    /// Effective worker count, resolving `0` to the number of CPU cores.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

impl Default for FsSourceConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            exclude: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            max_file_size: 10_485_760,
            follow_links: false,
            max_depth: 64,
            max_files: 100_000,
            max_total_bytes: 536_870_912,
            jobs: 0,
            timeout: None,
        }
    }
}
