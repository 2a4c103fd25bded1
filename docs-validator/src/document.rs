//! Document model and per-file analysis.
//!
//! A file is an arena of sub-documents, one per front-matter block.
//! Analysis is a pure function of the file text: every parse failure is
//! turned into an [`Issue`] at this boundary.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ValidationConfig;
use crate::error::{Issue, ParseError};
use crate::format::front_matter::{FrontMatter, split_sub_documents};
use crate::format::markdown::{code_block_issues, scan_body};
use crate::format::quiz::{QuizBlock, parse_quiz};
use crate::schema::validate_front_matter;

/// A fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Opening fence line (1-indexed).
    pub line: usize,
    /// Language tag from the info string, lowercased.
    pub language: Option<String>,
    /// Lines between the fences.
    pub line_count: usize,
    /// Whether a closing fence was found.
    pub terminated: bool,
}

/// One logical article inside a file.
#[derive(Debug, Clone, PartialEq)]
pub struct SubDocument {
    /// Position within the file, starting at 0.
    pub index: usize,
    /// First line (1-indexed).
    pub start_line: usize,
    /// Last line (1-indexed).
    pub end_line: usize,
    /// `None` when the block is missing or failed to parse.
    pub front_matter: Option<FrontMatter>,
    pub quizzes: Vec<QuizBlock>,
    pub code_blocks: Vec<CodeBlock>,
}

/// One content file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    pub raw: String,
    pub sub_documents: Vec<SubDocument>,
}

/// Result of analyzing one file in isolation.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub document: Document,
    pub issues: Vec<Issue>,
}

/// Line layout of one sub-document (0-based indices).
struct Layout {
    front_matter: Option<(usize, usize)>,
    body_start: usize,
    end: usize,
}

/// Parse and validate a single file.
#[must_use]
pub fn analyze_document(path: &Path, content: String, config: &ValidationConfig) -> FileOutcome {
    let mut issues = Vec::new();
    let mut sub_documents = Vec::new();
    let lines: Vec<&str> = content.lines().collect();

    let layouts = match split_sub_documents(&lines) {
        Ok(spans) => spans
            .into_iter()
            .map(|span| Layout {
                front_matter: Some((span.open, span.close)),
                body_start: span.body_start(),
                end: span.end,
            })
            .collect(),
        Err(err @ ParseError::MissingFrontMatter) => {
            issues.push(err.into_issue(path));
            vec![Layout {
                front_matter: None,
                body_start: 0,
                end: lines.len(),
            }]
        }
        Err(err) => {
            issues.push(err.into_issue(path));
            Vec::new()
        }
    };

    for (index, layout) in layouts.into_iter().enumerate() {
        let front_matter = layout.front_matter.and_then(|(open, close)| {
            match FrontMatter::from_lines(&lines[open + 1..close], open + 1) {
                Ok(fm) => Some(fm),
                Err(err) => {
                    issues.push(err.into_issue(path));
                    None
                }
            }
        });
        if let Some(fm) = &front_matter {
            issues.extend(validate_front_matter(fm, path, config));
        }

        let body = scan_body(&lines[layout.body_start..layout.end], layout.body_start + 1);
        issues.extend(body.errors.into_iter().map(|err| err.into_issue(path)));
        issues.extend(code_block_issues(&body.code_blocks, path, config));

        let mut quizzes = Vec::with_capacity(body.quiz_regions.len());
        for region in &body.quiz_regions {
            let (quiz, quiz_issues) = parse_quiz(region, path, config);
            issues.extend(quiz_issues);
            quizzes.push(quiz);
        }

        sub_documents.push(SubDocument {
            index,
            start_line: layout.front_matter.map_or(layout.body_start, |(open, _)| open) + 1,
            end_line: layout.end,
            front_matter,
            quizzes,
            code_blocks: body.code_blocks,
        });
    }

    debug!(
        file = %path.display(),
        sub_documents = sub_documents.len(),
        issues = issues.len(),
        "analyzed document"
    );

    FileOutcome {
        document: Document {
            path: path.to_owned(),
            raw: content,
            sub_documents,
        },
        issues,
    }
}
