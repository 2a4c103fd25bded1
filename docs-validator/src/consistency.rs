//! Corpus-wide checks run after every file has been analyzed.
//!
//! Works on the immutable collected documents; output depends only on the
//! document set, never on the order in which workers finished.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use crate::document::Document;
use crate::error::{Issue, IssueKind};
use crate::schema::canonical_parts;

/// Where a value was declared.
#[derive(Debug, Clone, Copy)]
struct Location<'a> {
    file: &'a Path,
    line: usize,
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

fn join_locations(locations: &[Location<'_>]) -> String {
    locations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Navigation section of a document: the parent path of its canonical URL
/// (`https://host/1/21/atoms/` is in `/1/21/`), or its directory when no
/// valid canonical URL is declared.
#[must_use]
pub fn section_key(canonical: Option<&str>, file: &Path) -> String {
    if let Some((_, url_path)) = canonical.and_then(canonical_parts) {
        let url_path = url_path.split(['?', '#']).next().unwrap_or(url_path);
        let trimmed = url_path.trim_end_matches('/');
        return match trimmed.rfind('/') {
            Some(idx) => trimmed[..=idx].to_owned(),
            None => "/".to_owned(),
        };
    }
    let dir = file.parent().map(Path::display).map(|d| d.to_string());
    format!("dir:{}/", dir.unwrap_or_default())
}

/// Detect duplicate canonical URLs and `nav_weight` collisions.
#[must_use]
pub fn check_consistency(documents: &[Document]) -> Vec<Issue> {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut canonicals: BTreeMap<&str, Vec<Location<'_>>> = BTreeMap::new();
    let mut weights: BTreeMap<(String, u64), Vec<Location<'_>>> = BTreeMap::new();

    for document in sorted {
        for sub in &document.sub_documents {
            let Some(fm) = &sub.front_matter else {
                continue;
            };
            let canonical = fm.canonical();
            if let Some(url) = canonical {
                canonicals.entry(url).or_default().push(Location {
                    file: &document.path,
                    line: fm.line_of("canonical"),
                });
            }
            if let Some(weight) = fm.nav_weight() {
                weights
                    .entry((section_key(canonical, &document.path), weight))
                    .or_default()
                    .push(Location {
                        file: &document.path,
                        line: fm.line_of("nav_weight"),
                    });
            }
        }
    }

    let mut issues = Vec::new();

    for (url, locations) in &canonicals {
        if locations.len() < 2 {
            continue;
        }
        let first = locations[0];
        let files: BTreeSet<&Path> = locations.iter().map(|l| l.file).collect();
        if files.len() > 1 {
            issues.push(Issue::error(
                first.file,
                first.line,
                IssueKind::DuplicateCanonical,
                format!(
                    "duplicate canonical URL '{url}' declared in {} documents: {}",
                    locations.len(),
                    join_locations(locations)
                ),
            ));
        } else {
            let lines: Vec<String> = locations.iter().map(|l| l.line.to_string()).collect();
            issues.push(Issue::warning(
                first.file,
                first.line,
                IssueKind::DuplicateCanonical,
                format!(
                    "canonical URL '{url}' is repeated by {} articles in the same file (lines {})",
                    locations.len(),
                    lines.join(", ")
                ),
            ));
        }
    }

    for ((section, weight), locations) in &weights {
        if locations.len() < 2 {
            continue;
        }
        let first = locations[0];
        issues.push(Issue::warning(
            first.file,
            first.line,
            IssueKind::NavWeightCollision,
            format!(
                "nav_weight {weight} is shared by {} documents in section '{section}': {}",
                locations.len(),
                join_locations(locations)
            ),
        ));
    }

    issues
}
