//! Markdown structure scanner.
//!
//! Tracks fenced code blocks and `quizdown` shortcodes line by line so that
//! neither the front-matter splitter nor the quiz parser looks inside code.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ValidationConfig;
use crate::document::CodeBlock;
use crate::error::{Issue, IssueKind, ParseError};

static QUIZ_OPEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\s*\{\{<\s*quizdown(?:\s+[^>]*?)?\s*>\}\}\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid quizdown opening regex: {err}"),
    }
});

static QUIZ_CLOSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^\s*\{\{<\s*/\s*quizdown\s*>\}\}\s*$") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid quizdown closing regex: {err}"),
    }
});

/// Returns the fence character and run length when `trimmed_line` opens or
/// closes a fenced code block (``` or ~~~, three or more).
#[must_use]
pub fn parse_fence(trimmed_line: &str) -> Option<(char, usize)> {
    let fence_char = match trimmed_line.as_bytes().first() {
        Some(b'`') => '`',
        Some(b'~') => '~',
        _ => return None,
    };

    let fence_len = trimmed_line
        .chars()
        .take_while(|&c| c == fence_char)
        .count();
    if fence_len >= 3 {
        Some((fence_char, fence_len))
    } else {
        None
    }
}

/// Whether a fence line with `fence_char`/`fence_len` closes the open fence.
#[must_use]
pub fn closes_fence(trimmed_line: &str, open: (char, usize)) -> bool {
    match parse_fence(trimmed_line) {
        Some((fence_char, fence_len)) => {
            fence_char == open.0
                && fence_len >= open.1
                && trimmed_line[fence_len..].trim().is_empty()
        }
        None => false,
    }
}

/// Structural meaning of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    FenceOpen { language: Option<String> },
    FenceClose,
    QuizOpen,
    /// An opening marker while a quiz block is already open.
    QuizReopen,
    QuizClose,
    /// A closing marker with no open quiz block.
    UnmatchedQuizClose,
    Text,
}

/// Line-by-line tracker for code fences and quizdown blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockTracker {
    fence: Option<(char, usize)>,
    quiz_open: bool,
}

impl BlockTracker {
    /// Classify `line` and advance the state.
    pub fn feed(&mut self, line: &str) -> LineEvent {
        let trimmed = line.trim_start();

        if let Some(open) = self.fence {
            if closes_fence(trimmed, open) {
                self.fence = None;
                return LineEvent::FenceClose;
            }
            return LineEvent::Text;
        }

        if let Some((fence_char, fence_len)) = parse_fence(trimmed) {
            self.fence = Some((fence_char, fence_len));
            let language = trimmed[fence_len..]
                .split_whitespace()
                .next()
                .map(|tag| tag.trim_matches(|c| c == '{' || c == '}').to_lowercase())
                .filter(|tag| !tag.is_empty());
            return LineEvent::FenceOpen { language };
        }

        if QUIZ_OPEN_PATTERN.is_match(line) {
            if self.quiz_open {
                return LineEvent::QuizReopen;
            }
            self.quiz_open = true;
            return LineEvent::QuizOpen;
        }

        if QUIZ_CLOSE_PATTERN.is_match(line) {
            if self.quiz_open {
                self.quiz_open = false;
                return LineEvent::QuizClose;
            }
            return LineEvent::UnmatchedQuizClose;
        }

        LineEvent::Text
    }

    #[must_use]
    pub fn in_fence(&self) -> bool {
        self.fence.is_some()
    }

    #[must_use]
    pub fn in_quiz(&self) -> bool {
        self.quiz_open
    }

    /// Neither inside a code fence nor inside a quiz block.
    #[must_use]
    pub fn in_prose(&self) -> bool {
        !self.in_fence() && !self.in_quiz()
    }

    /// Whether the fence or quiz block open in this tracker is closed
    /// somewhere in `lines`. A second quiz opening marker ends the search.
    #[must_use]
    pub fn closes_within(&self, lines: &[&str]) -> bool {
        let mut ahead = self.clone();
        for line in lines {
            if ahead.feed(line) == LineEvent::QuizReopen {
                return false;
            }
            if ahead.in_prose() {
                return true;
            }
        }
        false
    }
}

/// The raw lines of one terminated quizdown block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRegion<'a> {
    /// Line of the opening marker (1-indexed).
    pub open_line: usize,
    /// Line of the closing marker (1-indexed).
    pub close_line: usize,
    /// Lines strictly between the markers, with their line numbers.
    pub lines: Vec<(usize, &'a str)>,
}

/// Result of scanning the body of one sub-document.
#[derive(Debug, Default)]
pub struct BodyScan<'a> {
    pub code_blocks: Vec<CodeBlock>,
    pub quiz_regions: Vec<QuizRegion<'a>>,
    pub errors: Vec<ParseError>,
}

/// Scan body `lines`, the first of which is line `first_line` (1-indexed).
#[must_use]
pub fn scan_body<'a>(lines: &[&'a str], first_line: usize) -> BodyScan<'a> {
    let mut scan = BodyScan::default();
    let mut tracker = BlockTracker::default();
    let mut code: Option<CodeBlock> = None;
    let mut quiz: Option<QuizRegion<'a>> = None;

    for (idx, line) in lines.iter().enumerate() {
        let line_number = first_line + idx;
        match tracker.feed(line) {
            LineEvent::FenceOpen { language } => {
                if let Some(region) = quiz.as_mut() {
                    region.lines.push((line_number, line));
                } else {
                    code = Some(CodeBlock {
                        line: line_number,
                        language,
                        line_count: 0,
                        terminated: false,
                    });
                }
            }
            LineEvent::FenceClose => {
                if let Some(region) = quiz.as_mut() {
                    region.lines.push((line_number, line));
                } else if let Some(mut block) = code.take() {
                    block.terminated = true;
                    scan.code_blocks.push(block);
                }
            }
            LineEvent::QuizOpen => {
                quiz = Some(QuizRegion {
                    open_line: line_number,
                    close_line: line_number,
                    lines: Vec::new(),
                });
            }
            LineEvent::QuizReopen => {
                if let Some(previous) = quiz.take() {
                    scan.errors.push(ParseError::UnterminatedQuiz {
                        line: previous.open_line,
                    });
                }
                quiz = Some(QuizRegion {
                    open_line: line_number,
                    close_line: line_number,
                    lines: Vec::new(),
                });
            }
            LineEvent::QuizClose => {
                if let Some(mut region) = quiz.take() {
                    region.close_line = line_number;
                    scan.quiz_regions.push(region);
                }
            }
            LineEvent::UnmatchedQuizClose => {
                scan.errors
                    .push(ParseError::UnmatchedQuizClose { line: line_number });
            }
            LineEvent::Text => {
                if let Some(region) = quiz.as_mut() {
                    region.lines.push((line_number, line));
                } else if let Some(block) = code.as_mut() {
                    block.line_count += 1;
                }
            }
        }
    }

    if let Some(block) = code {
        scan.code_blocks.push(block);
    }
    if let Some(region) = quiz {
        scan.errors.push(ParseError::UnterminatedQuiz {
            line: region.open_line,
        });
    }

    scan
}

/// Issues for fenced code blocks: unterminated fences, and missing language
/// tags when `require_code_language` is set.
#[must_use]
pub fn code_block_issues(
    code_blocks: &[CodeBlock],
    path: &Path,
    config: &ValidationConfig,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for block in code_blocks {
        if !block.terminated {
            issues.push(Issue::warning(
                path,
                block.line,
                IssueKind::CodeBlock,
                format!(
                    "unterminated code fence opened at line {}; the rest of the file is treated as code",
                    block.line
                ),
            ));
        }
        if config.require_code_language && block.language.is_none() {
            issues.push(Issue::warning(
                path,
                block.line,
                IssueKind::CodeBlock,
                "code fence has no language tag",
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(content: &str) -> Vec<&str> {
        content.lines().collect()
    }

    #[test]
    fn test_tracker_ignores_markers_in_code() {
        let mut tracker = BlockTracker::default();
        assert_eq!(
            tracker.feed("```markdown"),
            LineEvent::FenceOpen {
                language: Some("markdown".to_owned())
            }
        );
        assert_eq!(tracker.feed("{{< quizdown >}}"), LineEvent::Text);
        assert_eq!(tracker.feed("```"), LineEvent::FenceClose);
        assert!(tracker.in_prose());
    }

    #[test]
    fn test_tracker_closes_within() {
        let mut tracker = BlockTracker::default();
        tracker.feed("{{< quizdown >}}");
        assert!(tracker.closes_within(&["```yaml", "---", "```", "{{< /quizdown >}}"]));
        assert!(!tracker.closes_within(&["### Q", "- [x] a"]));
        assert!(!tracker.closes_within(&["{{< quizdown >}}", "{{< /quizdown >}}"]));

        let mut tracker = BlockTracker::default();
        tracker.feed("~~~~");
        assert!(!tracker.closes_within(&["~~~", "text"]));
        assert!(tracker.closes_within(&["text", "~~~~"]));
    }

    #[test]
    fn test_tracker_quiz_markers_with_attributes() {
        let mut tracker = BlockTracker::default();
        assert_eq!(
            tracker.feed(r#"{{< quizdown shuffle_answers="false" >}}"#),
            LineEvent::QuizOpen
        );
        assert!(tracker.in_quiz());
        assert_eq!(tracker.feed("{{</ quizdown >}}"), LineEvent::QuizClose);
        assert_eq!(
            tracker.feed("{{< /quizdown >}}"),
            LineEvent::UnmatchedQuizClose
        );
    }

    #[test]
    fn test_mismatched_fence_does_not_close_block() {
        let mut tracker = BlockTracker::default();
        tracker.feed("```clojure");
        assert_eq!(tracker.feed("~~~"), LineEvent::Text);
        assert_eq!(tracker.feed("``` not-a-close"), LineEvent::Text);
        assert!(tracker.in_fence());
        assert_eq!(tracker.feed("````"), LineEvent::FenceClose);
    }

    #[test]
    fn test_scan_body_collects_code_blocks() {
        let body = lines("Intro\n\n```clojure\n(+ 1 2)\n(* 3 4)\n```\n\n~~~\nplain\n~~~\n");
        let scan = scan_body(&body, 10);
        assert_eq!(scan.code_blocks.len(), 2);
        assert_eq!(scan.code_blocks[0].line, 12);
        assert_eq!(scan.code_blocks[0].language.as_deref(), Some("clojure"));
        assert_eq!(scan.code_blocks[0].line_count, 2);
        assert!(scan.code_blocks[0].terminated);
        assert_eq!(scan.code_blocks[1].language, None);
        assert!(scan.errors.is_empty());
    }

    #[test]
    fn test_scan_body_quiz_region_lines() {
        let body = lines("{{< quizdown >}}\n### Q\n- [x] a\n{{< /quizdown >}}\n");
        let scan = scan_body(&body, 1);
        assert_eq!(scan.quiz_regions.len(), 1);
        let region = &scan.quiz_regions[0];
        assert_eq!(region.open_line, 1);
        assert_eq!(region.close_line, 4);
        assert_eq!(region.lines, vec![(2, "### Q"), (3, "- [x] a")]);
    }

    #[test]
    fn test_scan_body_unterminated_quiz() {
        let body = lines("text\n{{< quizdown >}}\n### Q\n- [x] a\n");
        let scan = scan_body(&body, 5);
        assert!(scan.quiz_regions.is_empty());
        assert_eq!(scan.errors, vec![ParseError::UnterminatedQuiz { line: 6 }]);
    }

    #[test]
    fn test_scan_body_reopen_reports_previous_block() {
        let body = lines("{{< quizdown >}}\n### Q\n{{< quizdown >}}\n### R\n{{< /quizdown >}}\n");
        let scan = scan_body(&body, 1);
        assert_eq!(scan.errors, vec![ParseError::UnterminatedQuiz { line: 1 }]);
        assert_eq!(scan.quiz_regions.len(), 1);
        assert_eq!(scan.quiz_regions[0].open_line, 3);
    }

    #[test]
    fn test_code_block_issues() {
        let blocks = vec![
            CodeBlock {
                line: 3,
                language: None,
                line_count: 1,
                terminated: true,
            },
            CodeBlock {
                line: 9,
                language: Some("java".to_owned()),
                line_count: 4,
                terminated: false,
            },
        ];
        let path = Path::new("doc.md");

        let relaxed = code_block_issues(&blocks, path, &ValidationConfig::default());
        assert_eq!(relaxed.len(), 1);
        assert_eq!(relaxed[0].line, 9);

        let mut strict_config = ValidationConfig::default();
        strict_config.require_code_language = true;
        let strict = code_block_issues(&blocks, path, &strict_config);
        assert_eq!(strict.len(), 2);
        assert!(strict.iter().any(|i| i.message.contains("no language tag")));
    }
}
