//! Front-matter schema checks.
//!
//! Never fails: every problem degrades to an [`Issue`], and each malformed
//! field produces exactly one.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use crate::config::{DomainPolicy, ValidationConfig};
use crate::error::{Issue, IssueKind, Severity};
use crate::format::front_matter::{FrontMatter, value_kind};

/// `https://<domain>[:port]/<path>`
static CANONICAL_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(concat!(
        r"^https://",
        r"((?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,})", // host
        r"(?::[0-9]{1,5})?",                                            // optional port
        r"(/[^\s]*)$",                                                  // path
    )) {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid canonical URL regex: {err}"),
    }
});

/// Split a canonical URL into `(host, path)`; `None` if it is not of the
/// form `https://<domain>/<path>`.
#[must_use]
pub fn canonical_parts(url: &str) -> Option<(&str, &str)> {
    let caps = CANONICAL_URL_PATTERN.captures(url)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Whether `value` is an ISO-8601 date or date-time.
#[must_use]
pub fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
}

type Finding = (Severity, String);

fn error(message: String) -> Option<Finding> {
    Some((Severity::Error, message))
}

/// Validate one front-matter block.
#[must_use]
pub fn validate_front_matter(
    front_matter: &FrontMatter,
    path: &Path,
    config: &ValidationConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();

    for field in &config.required_fields {
        if !front_matter.contains(field) {
            issues.push(Issue::error(
                path,
                front_matter.start_line,
                IssueKind::Schema,
                format!("missing required field '{field}'"),
            ));
        }
    }

    for (key, value) in &front_matter.fields {
        let finding = match key.as_str() {
            "title" => check_title(value),
            "canonical" => check_canonical(value, &config.domain_policy),
            "tags" => check_tags(value),
            "date" => check_date(value),
            "type" => check_type(value, &config.allowed_types),
            "nav_weight" => check_nav_weight(value),
            "license" => check_license(value),
            _ => None,
        };
        if let Some((severity, message)) = finding {
            issues.push(Issue::new(
                path,
                front_matter.line_of(key),
                severity,
                IssueKind::Schema,
                message,
            ));
        }
    }

    issues
}

/// Text of a number or boolean that YAML read from an unquoted scalar.
fn unquoted_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn check_title(value: &Value) -> Option<Finding> {
    if let Some(text) = unquoted_scalar(value) {
        return Some((
            Severity::Warning,
            format!(
                "field 'title' was read as {} ({text}); quote it to keep it as text",
                value_kind(value)
            ),
        ));
    }
    match value {
        Value::String(s) if !s.trim().is_empty() => None,
        Value::String(_) => error("field 'title' must not be empty".to_owned()),
        other => error(format!(
            "field 'title' must be a non-empty string, found {}",
            value_kind(other)
        )),
    }
}

fn check_canonical(value: &Value, policy: &DomainPolicy) -> Option<Finding> {
    let Value::String(url) = value else {
        return error(format!(
            "field 'canonical' must be a URL string, found {}",
            value_kind(value)
        ));
    };
    let url = url.trim();
    let Some((host, _)) = canonical_parts(url) else {
        return error(format!(
            "field 'canonical' must look like https://<domain>/<path>, found '{url}'"
        ));
    };
    if !policy.accepts(host) {
        return error(format!(
            "canonical host '{host}' is not allowed; expected {}",
            policy.describe()
        ));
    }
    None
}

fn check_tags(value: &Value) -> Option<Finding> {
    let Value::Array(tags) = value else {
        return error(format!(
            "field 'tags' must be a list of strings, found {}",
            value_kind(value)
        ));
    };
    if tags.is_empty() {
        return error("field 'tags' must not be empty".to_owned());
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut unquoted = Vec::new();
    for tag in tags {
        let text = match tag {
            Value::String(s) => s.trim().to_owned(),
            other => match unquoted_scalar(other) {
                Some(text) => {
                    unquoted.push(text.clone());
                    text
                }
                None => {
                    return error(format!(
                        "field 'tags' must contain only strings, found {}",
                        value_kind(other)
                    ));
                }
            },
        };
        if text.is_empty() {
            return error("field 'tags' contains an empty tag".to_owned());
        }
        if !seen.insert(text.to_lowercase()) {
            duplicates.push(text);
        }
    }

    let mut notes = Vec::new();
    if !unquoted.is_empty() {
        notes.push(format!(
            "field 'tags' has values read as numbers or booleans ({}); quote them",
            unquoted.join(", ")
        ));
    }
    if !duplicates.is_empty() {
        notes.push(format!("field 'tags' repeats: {}", duplicates.join(", ")));
    }
    if notes.is_empty() {
        None
    } else {
        Some((Severity::Warning, notes.join("; ")))
    }
}

fn check_date(value: &Value) -> Option<Finding> {
    match value {
        Value::String(s) if is_iso_date(s.trim()) => None,
        Value::String(s) => error(format!(
            "field 'date' must be an ISO-8601 date (YYYY-MM-DD), found '{s}'"
        )),
        other => error(format!(
            "field 'date' must be an ISO-8601 date string, found {}",
            value_kind(other)
        )),
    }
}

fn check_type(value: &Value, allowed: &[String]) -> Option<Finding> {
    match value.as_str() {
        Some(t) if allowed.iter().any(|a| a == t) => None,
        Some(t) => error(format!(
            "field 'type' must be one of [{}], found '{t}'",
            allowed.join(", ")
        )),
        None => error(format!(
            "field 'type' must be a string, found {}",
            value_kind(value)
        )),
    }
}

fn check_nav_weight(value: &Value) -> Option<Finding> {
    let Value::Number(n) = value else {
        return error(format!(
            "field 'nav_weight' must be a positive integer, found {}",
            value_kind(value)
        ));
    };
    if n.as_u64().is_some_and(|w| w > 0) {
        return None;
    }
    if n.is_i64() || n.is_u64() {
        return error(format!(
            "field 'nav_weight' must be a positive integer, found {n}"
        ));
    }
    error(format!("field 'nav_weight' must be an integer, found {n}"))
}

fn check_license(value: &Value) -> Option<Finding> {
    match value {
        Value::String(s) if !s.trim().is_empty() => None,
        other => error(format!(
            "field 'license' must be a non-empty string, found {}",
            if other.is_string() {
                "an empty string"
            } else {
                value_kind(other)
            }
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = concat!(
        "title: \"Managing state with atoms\"\n",
        "canonical: \"https://example.com/1/21/atoms/\"\n",
        "tags:\n",
        "  - \"clojure\"\n",
        "  - \"state\"\n",
        "date: 2024-05-01\n",
        "type: docs\n",
        "nav_weight: 3\n",
        "license: \"CC BY-SA 4.0\"\n",
    );

    fn validate(block: &str) -> Vec<Issue> {
        let fm = FrontMatter::parse(block, 1).unwrap();
        validate_front_matter(&fm, Path::new("doc.md"), &ValidationConfig::default())
    }

    fn without_field(field: &str) -> String {
        let mut out = String::new();
        let mut skipping = false;
        for line in VALID.lines() {
            if line.starts_with(&format!("{field}:")) {
                skipping = true;
                continue;
            }
            if skipping && line.starts_with(' ') {
                continue;
            }
            skipping = false;
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn with_field(field: &str, value: &str) -> String {
        let mut out = without_field(field);
        out.push_str(field);
        out.push_str(": ");
        out.push_str(value);
        out.push('\n');
        out
    }

    #[test]
    fn test_valid_front_matter() {
        let issues = validate(VALID);
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_each_missing_field_yields_one_issue() {
        for field in ["canonical", "title", "tags", "date", "nav_weight", "type"] {
            let issues = validate(&without_field(field));
            assert_eq!(issues.len(), 1, "{field}: {issues:?}");
            assert_eq!(issues[0].kind, IssueKind::Schema);
            assert_eq!(issues[0].severity, Severity::Error);
            assert!(issues[0].message.contains(&format!("'{field}'")));
        }
    }

    #[test]
    fn test_invalid_field_values() {
        let cases = [
            ("title", "\"\""),
            ("title", "[a, b]"),
            ("canonical", "\"http://example.com/x\""),
            ("canonical", "\"https://example.com\""),
            ("canonical", "\"not a url\""),
            ("tags", "[]"),
            ("tags", "clojure"),
            ("tags", "[[a], b]"),
            ("date", "\"yesterday\""),
            ("date", "2024-13-45"),
            ("type", "blog"),
            ("nav_weight", "0"),
            ("nav_weight", "-4"),
            ("nav_weight", "2.5"),
            ("nav_weight", "\"3\""),
            ("license", "\"\""),
        ];
        for (field, value) in cases {
            let issues = validate(&with_field(field, value));
            assert_eq!(issues.len(), 1, "{field}: {value} -> {issues:?}");
            assert_eq!(issues[0].severity, Severity::Error, "{field}: {value}");
            assert!(issues[0].message.contains(field), "{field}: {value}");
        }
    }

    #[test]
    fn test_issue_points_at_field_line() {
        let issues = validate(&with_field("nav_weight", "0"));
        assert_eq!(issues[0].line, 10);
    }

    #[test]
    fn test_duplicate_tags_warn() {
        let issues = validate(&with_field("tags", "[clojure, Clojure, jvm]"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unquoted_scalar_title_warns() {
        for value in ["1984", "true"] {
            let issues = validate(&with_field("title", value));
            assert_eq!(issues.len(), 1, "{value}: {issues:?}");
            assert_eq!(issues[0].severity, Severity::Warning, "{value}");
            assert!(issues[0].message.contains("quote it"), "{}", issues[0].message);
            assert!(issues[0].message.contains(value), "{}", issues[0].message);
        }
    }

    #[test]
    fn test_unquoted_scalar_tags_warn() {
        let issues = validate(&with_field("tags", "[clojure, 2024, true]"));
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("2024, true"), "{}", issues[0].message);
    }

    #[test]
    fn test_unquoted_scalar_tags_count_as_duplicates() {
        let issues = validate(&with_field("tags", "[\"2024\", 2024]"));
        assert_eq!(issues.len(), 1, "{issues:?}");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("repeats: 2024"), "{}", issues[0].message);
    }

    #[test]
    fn test_date_formats() {
        assert!(is_iso_date("2024-05-01"));
        assert!(is_iso_date("2024-05-01T10:20:30Z"));
        assert!(is_iso_date("2024-05-01T10:20:30+02:00"));
        assert!(is_iso_date("2024-05-01T10:20:30"));
        assert!(!is_iso_date("05/01/2024"));
    }

    #[test]
    fn test_canonical_domain_policy() {
        let fm = FrontMatter::parse(VALID, 1).unwrap();
        let mut config = ValidationConfig::default();
        config.domain_policy = DomainPolicy::MustMatch("docs.example.org".to_owned());
        let issues = validate_front_matter(&fm, Path::new("doc.md"), &config);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("'example.com' is not allowed"));

        config.domain_policy = DomainPolicy::AllowList(vec![
            "docs.example.org".to_owned(),
            "example.com".to_owned(),
        ]);
        assert!(validate_front_matter(&fm, Path::new("doc.md"), &config).is_empty());
    }

    #[test]
    fn test_canonical_parts() {
        assert_eq!(
            canonical_parts("https://example.com/1/21/atoms/"),
            Some(("example.com", "/1/21/atoms/"))
        );
        assert_eq!(
            canonical_parts("https://localhost.dev:8080/"),
            Some(("localhost.dev", "/"))
        );
        assert_eq!(canonical_parts("https://example.com"), None);
    }
}
