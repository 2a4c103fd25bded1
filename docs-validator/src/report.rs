//! Validation report types.

use serde::Serialize;

use crate::error::{Issue, Severity};

/// Result of a validation run.
///
/// Issues are sorted by (file, line, severity, message), so two runs over
/// the same corpus produce identical reports regardless of worker count.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ValidationReport {
    /// Number of files successfully read and analyzed.
    pub scanned_files: usize,
    /// Number of files that could not be read.
    pub failed_files: usize,
    /// Number of logical sub-documents analyzed.
    pub documents: usize,
    /// `false` when a timeout or resource limit cut the run short.
    pub complete: bool,
    /// Whether there are no error-severity issues and the run completed.
    pub ok: bool,
    /// Every finding, sorted.
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    #[must_use]
    pub fn new(
        scanned_files: usize,
        failed_files: usize,
        documents: usize,
        complete: bool,
        mut issues: Vec<Issue>,
    ) -> Self {
        issues.sort_by(Issue::report_order);
        issues.dedup();
        let ok = complete && !issues.iter().any(|i| i.severity == Severity::Error);
        Self {
            scanned_files,
            failed_files,
            documents,
            complete,
            ok,
            issues,
        }
    }

    /// Total number of files attempted (scanned + failed).
    #[must_use]
    pub fn files_attempted(&self) -> usize {
        self.scanned_files + self.failed_files
    }

    /// Number of error-severity issues.
    #[must_use]
    pub fn errors_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of warning-severity issues.
    #[must_use]
    pub fn warnings_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Whether any issue is at or above `threshold`.
    #[must_use]
    pub fn has_issues_at(&self, threshold: Severity) -> bool {
        self.issues.iter().any(|i| i.severity.is_at_least(threshold))
    }
}
