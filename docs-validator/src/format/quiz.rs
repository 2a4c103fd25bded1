//! Quizdown block parser.
//!
//! A block holds multiple-choice questions written as Markdown:
//!
//! ```text
//! ### What does `swap!` return?
//! - [x] The new value
//! - [ ] The old value
//! > **Explanation:** `swap!` returns the value that was swapped in.
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ValidationConfig;
use crate::error::{Issue, IssueKind};
use crate::format::markdown::{QuizRegion, closes_fence, parse_fence};

static HEADING_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^ {0,3}#{1,6}\s+(.*?)(?:\s+#+)?\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid question heading regex: {err}"),
    }
});

static OPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\s*[-*+]\s+\[([ xX])\]\s*(.*?)\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid quiz option regex: {err}"),
    }
});

/// A list item that starts with a short bracketed marker but is not a valid
/// `[ ]`/`[x]` option. Markdown links (`[text](url)`) are not matched.
static MALFORMED_OPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\s*[-*+]\s+\[([^\]]{0,3})\](?:[^(]|$)\s*(.*?)\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid malformed quiz option regex: {err}"),
    }
});

static EXPLANATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"(?i)^\s*>\s*\*\*explanation(?::\*\*|\*\*\s*:)\s*(.*?)\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid explanation regex: {err}"),
    }
});

/// Prompts longer than this are shortened in messages.
const PROMPT_PREVIEW_CHARS: usize = 60;

/// One answer option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    pub line: usize,
    pub text: String,
    pub correct: bool,
}

/// One question with its options and explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Heading line (1-indexed).
    pub line: usize,
    pub prompt: String,
    pub options: Vec<QuizOption>,
    pub explanation: Option<String>,
}

impl Question {
    fn new(line: usize, prompt: &str) -> Self {
        Self {
            line,
            prompt: prompt.to_owned(),
            options: Vec::new(),
            explanation: None,
        }
    }

    /// Number of options marked `[x]`.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.options.iter().filter(|o| o.correct).count()
    }

    fn preview(&self) -> String {
        let mut preview: String = self.prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
        if self.prompt.chars().count() > PROMPT_PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

/// A parsed `{{< quizdown >}}` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizBlock {
    pub open_line: usize,
    pub close_line: usize,
    pub questions: Vec<Question>,
}

/// Parse a terminated quiz region and check every question.
///
/// Malformed markup never fails the parse; it is reported as issues.
#[must_use]
pub fn parse_quiz(
    region: &QuizRegion<'_>,
    path: &Path,
    config: &ValidationConfig,
) -> (QuizBlock, Vec<Issue>) {
    let mut issues = Vec::new();
    let mut questions = Vec::new();
    let mut current: Option<Question> = None;
    let mut in_explanation = false;
    let mut fence: Option<(char, usize)> = None;

    for &(line_number, line) in &region.lines[quiz_header_len(&region.lines)..] {
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            if closes_fence(trimmed, open) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = parse_fence(trimmed) {
            fence = Some(open);
            in_explanation = false;
            continue;
        }

        if let Some(caps) = HEADING_PATTERN.captures(line) {
            questions.extend(current.take());
            current = Some(Question::new(line_number, &caps[1]));
            in_explanation = false;
            continue;
        }

        if let Some(caps) = OPTION_PATTERN.captures(line) {
            in_explanation = false;
            if let Some(question) = current.as_mut() {
                question.options.push(QuizOption {
                    line: line_number,
                    text: caps[2].to_owned(),
                    correct: &caps[1] != " ",
                });
            } else {
                issues.push(Issue::error(
                    path,
                    line_number,
                    IssueKind::QuizStructure,
                    "answer option appears before any question heading",
                ));
            }
            continue;
        }

        if let Some(caps) = MALFORMED_OPTION_PATTERN.captures(line) {
            in_explanation = false;
            issues.push(Issue::error(
                path,
                line_number,
                IssueKind::QuizStructure,
                format!("malformed answer marker '[{}]'; use '[ ]' or '[x]'", &caps[1]),
            ));
            // Still an option of its question, so the option count stays right.
            if let Some(question) = current.as_mut() {
                question.options.push(QuizOption {
                    line: line_number,
                    text: caps[2].to_owned(),
                    correct: caps[1].contains(['x', 'X']),
                });
            }
            continue;
        }

        if let Some(caps) = EXPLANATION_PATTERN.captures(line) {
            if let Some(question) = current.as_mut() {
                question.explanation = Some(caps[1].to_owned());
                in_explanation = true;
            } else {
                issues.push(Issue::error(
                    path,
                    line_number,
                    IssueKind::QuizStructure,
                    "explanation appears before any question heading",
                ));
            }
            continue;
        }

        if in_explanation {
            if let Some(rest) = trimmed.strip_prefix('>')
                && let Some(explanation) = current.as_mut().and_then(|q| q.explanation.as_mut())
            {
                let rest = rest.trim();
                if !rest.is_empty() {
                    if !explanation.is_empty() {
                        explanation.push(' ');
                    }
                    explanation.push_str(rest);
                }
                continue;
            }
            in_explanation = false;
        }
    }
    questions.extend(current);

    if questions.is_empty() {
        issues.push(Issue::warning(
            path,
            region.open_line,
            IssueKind::QuizStructure,
            "quizdown block contains no questions",
        ));
    }
    for question in &questions {
        issues.extend(check_question(question, path, config));
    }

    let block = QuizBlock {
        open_line: region.open_line,
        close_line: region.close_line,
        questions,
    };
    (block, issues)
}

/// Length of an optional quizdown `---` header at the start of the block.
fn quiz_header_len(lines: &[(usize, &str)]) -> usize {
    let Some(first) = lines.iter().position(|(_, l)| !l.trim().is_empty()) else {
        return 0;
    };
    if lines[first].1.trim() != "---" {
        return 0;
    }
    lines
        .iter()
        .skip(first + 1)
        .position(|(_, l)| l.trim() == "---")
        .map_or(0, |offset| first + offset + 2)
}

/// Structural checks for one question.
fn check_question(question: &Question, path: &Path, config: &ValidationConfig) -> Vec<Issue> {
    let mut issues = Vec::new();
    let prompt = question.preview();

    if question.options.is_empty() {
        issues.push(Issue::error(
            path,
            question.line,
            IssueKind::QuizStructure,
            format!("question '{prompt}' has no answer options"),
        ));
    } else {
        let correct = question.correct_count();
        if correct == 0 {
            issues.push(Issue::error(
                path,
                question.line,
                IssueKind::QuizStructure,
                format!("question '{prompt}' has no option marked [x]"),
            ));
        } else if correct > 1 && !config.allow_multi_select {
            issues.push(Issue::error(
                path,
                question.line,
                IssueKind::QuizStructure,
                format!(
                    "question '{prompt}' has {correct} options marked [x]; exactly one is allowed"
                ),
            ));
        }
        if question.options.len() == 1 {
            issues.push(Issue::warning(
                path,
                question.line,
                IssueKind::QuizStructure,
                format!("question '{prompt}' has only one answer option"),
            ));
        }
    }

    let has_explanation = question
        .explanation
        .as_deref()
        .is_some_and(|e| !e.trim().is_empty());
    if !has_explanation {
        issues.push(Issue::warning(
            path,
            question.line,
            IssueKind::QuizExplanation,
            format!("question '{prompt}' has no explanation ('> **Explanation:** ...')"),
        ));
    }

    issues
}
