//! # docs-validator
//!
//! Front-matter, quiz and consistency validator for static-site content.
//!
//! This crate provides a clean separation between the **core validation
//! engine** (pure functions over file text) and the **input strategy**
//! (filesystem discovery and a bounded worker pool).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use docs_validator::{validate_fs, DomainPolicy, FsSourceConfig, ValidationConfig};
//!
//! # async fn run() -> Result<(), docs_validator::FatalError> {
//! let mut fs_config = FsSourceConfig::default();
//! fs_config.paths = vec![PathBuf::from("content")];
//! fs_config.exclude = vec!["drafts/*".to_owned()];
//!
//! let mut validation_config = ValidationConfig::default();
//! validation_config.domain_policy = DomainPolicy::MustMatch("example.com".to_owned());
//!
//! let report = validate_fs(&fs_config, &validation_config).await?;
//! println!("Files scanned: {}", report.scanned_files);
//! println!("Errors: {}", report.errors_count());
//! println!("Warnings: {}", report.warnings_count());
//! println!("OK: {}", report.ok);
//! # Ok(())
//! # }
//! ```

mod config;
pub mod consistency;
pub mod document;
mod error;
pub mod format;
pub mod output;
mod pipeline;
mod report;
pub mod schema;
mod strategy;

pub use config::{
    DEFAULT_ALLOWED_TYPES, DEFAULT_EXTENSIONS, DEFAULT_REQUIRED_FIELDS, DomainPolicy,
    FsSourceConfig, ValidationConfig,
};
pub use document::{Document, FileOutcome, SubDocument, analyze_document};
pub use error::{FatalError, Issue, IssueKind, ParseError, Severity};
pub use report::ValidationReport;
pub use strategy::fs::SKIP_DIRS;

use tracing::{info, warn};

use consistency::check_consistency;
use strategy::fs::find_files;

/// Validate every content file under the configured paths.
///
/// This is the primary public API. Files are parsed and validated in
/// parallel, then checked against each other once all of them are in.
///
/// # Arguments
///
/// * `fs_config` - Filesystem source options (paths, exclude, limits, jobs, timeout)
/// * `validation_config` - Core validation config (required fields, domain policy, quiz rules)
///
/// # Errors
///
/// Returns [`FatalError`] if `fs_config.paths` is empty, a path does not
/// exist or cannot be listed, an exclude pattern is invalid, or a worker
/// crashes. Everything that concerns a single file (unreadable, oversized,
/// malformed) is reported in `report.issues` and never aborts the run.
pub async fn validate_fs(
    fs_config: &FsSourceConfig,
    validation_config: &ValidationConfig,
) -> Result<ValidationReport, FatalError> {
    let Some(first_root) = fs_config.paths.first() else {
        return Err(FatalError::NoPaths);
    };

    for path in &fs_config.paths {
        if !path.exists() {
            return Err(FatalError::RootNotFound(path.clone()));
        }
    }

    let (mut files, mut issues) = find_files(fs_config)?;
    // Discovery-stage failures (walk errors, boundary violations) count as failed files.
    let mut failed_files = issues.iter().filter(|i| i.kind.is_scan_failure()).count();
    let mut complete = true;

    if files.len() > fs_config.max_files {
        let skipped = files.split_off(fs_config.max_files);
        warn!(
            max_files = fs_config.max_files,
            skipped = skipped.len(),
            "max_files limit reached"
        );
        issues.push(Issue::error(
            skipped[0].clone(),
            0,
            IssueKind::LimitExceeded,
            format!(
                "scan aborted: max_files limit ({}) reached; {} file(s) not validated",
                fs_config.max_files,
                skipped.len()
            ),
        ));
        complete = false;
    }

    let pool = pipeline::run_pool(files, fs_config, validation_config).await?;
    failed_files += pool.failed_files;
    issues.extend(pool.issues);
    if pool.limit_exceeded {
        complete = false;
    }
    if pool.timed_out && pool.unvalidated > 0 {
        let millis = fs_config.timeout.map_or(0, |t| t.as_millis());
        issues.push(Issue::error(
            first_root.clone(),
            0,
            IssueKind::Incomplete,
            format!(
                "validation timed out after {millis} ms; {} file(s) not validated",
                pool.unvalidated
            ),
        ));
        complete = false;
    }

    let scanned_files = pool.outcomes.len();
    let mut documents = Vec::with_capacity(scanned_files);
    for outcome in pool.outcomes {
        issues.extend(outcome.issues);
        documents.push(outcome.document);
    }
    let sub_documents = documents.iter().map(|d| d.sub_documents.len()).sum();

    issues.extend(check_consistency(&documents));

    let report = ValidationReport::new(
        scanned_files,
        failed_files,
        sub_documents,
        complete,
        issues,
    );
    info!(
        scanned = report.scanned_files,
        failed = report.failed_files,
        documents = report.documents,
        errors = report.errors_count(),
        warnings = report.warnings_count(),
        complete = report.complete,
        "validation finished"
    );
    Ok(report)
}
