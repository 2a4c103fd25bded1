//! Shared output formatting for validation reports.
//!
//! Provides the JSON and plain-text issue listings plus a human summary
//! banner for `ValidationReport`. Color/terminal formatting is intentionally
//! excluded from this core module: that concern belongs to the CLI layer.

use std::io::Write;

use crate::error::IssueKind;
use crate::report::ValidationReport;

/// Write the issues of a `ValidationReport` as a JSON array of
/// `{file, line, severity, message}` objects.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json(report: &ValidationReport, writer: &mut dyn Write) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&report.issues)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Write one `<file>:<line>: [<severity>] <message>` line per issue.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_text(report: &ValidationReport, writer: &mut dyn Write) -> anyhow::Result<()> {
    for issue in &report.issues {
        writeln!(writer, "{}", issue.format_human_readable())?;
    }
    Ok(())
}

/// Write the human-readable summary banner.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary(report: &ValidationReport, writer: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer, "  CONTENT VALIDATOR")?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer)?;
    writeln!(writer, "  Files scanned:  {}", report.scanned_files)?;
    writeln!(writer, "  Files failed:   {}", report.failed_files)?;
    writeln!(writer, "  Documents:      {}", report.documents)?;
    writeln!(writer, "  Errors found:   {}", report.errors_count())?;
    writeln!(writer, "  Warnings found: {}", report.warnings_count())?;
    writeln!(writer)?;

    writeln!(writer, "{}", "=".repeat(80))?;
    if report.ok {
        writeln!(
            writer,
            "\u{2713} All {} files passed validation",
            report.scanned_files
        )?;
    } else {
        if !report.complete {
            writeln!(
                writer,
                "\u{2717} Validation did not finish; the report is partial"
            )?;
        }
        if report.failed_files > 0 {
            writeln!(
                writer,
                "\u{2717} {} file(s) could not be read",
                report.failed_files
            )?;
        }
        if report.errors_count() > 0 {
            writeln!(writer, "\u{2717} {} error(s) found", report.errors_count())?;
        }
    }

    let hints = fix_hints(report);
    if !hints.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "  To fix:")?;
        for hint in hints {
            writeln!(writer, "    - {hint}")?;
        }
    }
    writeln!(writer, "{}", "=".repeat(80))?;

    Ok(())
}

/// One hint per kind of issue present in the report, in a fixed order.
fn fix_hints(report: &ValidationReport) -> Vec<&'static str> {
    let has = |kind: IssueKind| report.issues.iter().any(|i| i.kind == kind);
    let mut hints = Vec::new();

    if has(IssueKind::FrontMatterParse) {
        hints.push("Start every article with a '---' line and close the block with another '---'");
    }
    if has(IssueKind::Schema) {
        hints.push("Declare title, canonical, tags, date, type and nav_weight in the front matter");
    }
    if has(IssueKind::QuizParse) {
        hints.push("Pair every {{< quizdown >}} with a {{< /quizdown >}}");
    }
    if has(IssueKind::QuizStructure) {
        hints.push("Mark exactly one option per question with - [x]");
    }
    if has(IssueKind::QuizExplanation) {
        hints.push("Follow each question's options with a '> **Explanation:**' line");
    }
    if has(IssueKind::CodeBlock) {
        hints.push("Close every ``` fence and give it a language tag");
    }
    if has(IssueKind::DuplicateCanonical) {
        hints.push("Give every article its own canonical URL");
    }
    if has(IssueKind::NavWeightCollision) {
        hints.push("Use distinct nav_weight values within a section");
    }
    if has(IssueKind::Incomplete) {
        hints.push("Raise --timeout or narrow the scanned paths");
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Issue;

    fn sample_report() -> ValidationReport {
        ValidationReport::new(
            2,
            0,
            2,
            true,
            vec![
                Issue::error("b.md", 4, IssueKind::Schema, "missing required field 'title'"),
                Issue::warning("a.md", 9, IssueKind::QuizExplanation, "question has no explanation"),
            ],
        )
    }

    #[test]
    fn test_write_text_one_line_per_issue() {
        let mut out = Vec::new();
        write_text(&sample_report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "a.md:9: [warning] question has no explanation\nb.md:4: [error] missing required field 'title'\n"
        );
    }

    #[test]
    fn test_write_json_is_issue_array() {
        let mut out = Vec::new();
        write_json(&sample_report(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["file"], "b.md");
        assert_eq!(items[1]["line"], 4);
        assert_eq!(items[1]["severity"], "error");
        assert!(items[1].get("kind").is_none());
    }

    #[test]
    fn test_write_json_empty_report() {
        let report = ValidationReport::new(1, 0, 1, true, Vec::new());
        let mut out = Vec::new();
        write_json(&report, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn test_summary_lists_hints_for_present_kinds() {
        let mut out = Vec::new();
        write_summary(&sample_report(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Errors found:   1"));
        assert!(text.contains("Warnings found: 1"));
        assert!(text.contains("nav_weight in the front matter"));
        assert!(text.contains("Explanation"));
        assert!(!text.contains("canonical URL"));
    }
}
