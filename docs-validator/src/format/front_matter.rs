//! Front-matter extraction.
//!
//! A content file starts with a `---` delimited YAML block. Some files
//! concatenate several articles, each with its own block, so the file is
//! split into sub-documents at every later `---` line that opens a
//! recognizable front-matter map outside code fences and quiz blocks.
//! A fence or quiz block that is never closed does not hide the articles
//! after it: the next recognizable map still starts a new sub-document.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ParseError;
use crate::format::markdown::BlockTracker;

/// Front-matter delimiter line.
pub const DELIMITER: &str = "---";

/// A later block must close within this many lines to be recognized.
pub const MAX_FRONT_MATTER_LINES: usize = 64;

/// Keys that mark a `---` block as front matter rather than a thematic break.
pub const KNOWN_KEYS: &[&str] = &["title", "canonical", "date", "tags", "type", "nav_weight"];

static KEY_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(r"^([A-Za-z_][A-Za-z0-9_.-]*)\s*:(?:\s|$)") {
        Ok(regex) => regex,
        Err(err) => panic!("Invalid front-matter key regex: {err}"),
    }
});

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

/// Line range of one logical sub-document (0-based line indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubDocumentSpan {
    /// Opening `---` line.
    pub open: usize,
    /// Closing `---` line.
    pub close: usize,
    /// First line after the sub-document (exclusive end).
    pub end: usize,
}

impl SubDocumentSpan {
    /// First body line (0-based).
    #[must_use]
    pub fn body_start(&self) -> usize {
        self.close + 1
    }
}

/// Partition a file into sub-documents, one per front-matter block.
///
/// # Errors
///
/// Returns [`ParseError::MissingFrontMatter`] if the first line is not `---`,
/// or [`ParseError::UnterminatedFrontMatter`] if it is never closed.
pub fn split_sub_documents(lines: &[&str]) -> Result<Vec<SubDocumentSpan>, ParseError> {
    let starts_with_delimiter = lines
        .first()
        .is_some_and(|first| is_delimiter(first.trim_start_matches('\u{feff}')));
    if !starts_with_delimiter {
        return Err(ParseError::MissingFrontMatter);
    }

    let first_close = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| is_delimiter(line))
        .map(|(idx, _)| idx)
        .ok_or(ParseError::UnterminatedFrontMatter { line: 1 })?;

    let mut spans = Vec::new();
    let mut open = 0;
    let mut close = first_close;
    let mut tracker = BlockTracker::default();
    let mut idx = first_close + 1;

    while idx < lines.len() {
        let line = lines[idx];
        if is_delimiter(line)
            && let Some(next_close) = recognize_front_matter(lines, idx)
            && (tracker.in_prose() || !tracker.closes_within(&lines[idx + 1..]))
        {
            spans.push(SubDocumentSpan {
                open,
                close,
                end: idx,
            });
            open = idx;
            close = next_close;
            idx = next_close + 1;
            tracker = BlockTracker::default();
            continue;
        }
        tracker.feed(line);
        idx += 1;
    }

    spans.push(SubDocumentSpan {
        open,
        close,
        end: lines.len(),
    });
    Ok(spans)
}

/// If the `---` at `open` starts a front-matter map, return its closing line.
fn recognize_front_matter(lines: &[&str], open: usize) -> Option<usize> {
    let mut saw_key = false;
    let mut saw_known_key = false;

    for (idx, line) in lines
        .iter()
        .enumerate()
        .skip(open + 1)
        .take(MAX_FRONT_MATTER_LINES)
    {
        if is_delimiter(line) {
            return saw_known_key.then_some(idx);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = KEY_LINE_PATTERN.captures(line) {
            saw_key = true;
            if KNOWN_KEYS.contains(&&caps[1]) {
                saw_known_key = true;
            }
            continue;
        }

        // The map must open with a key; after that, continuation lines,
        // list items and comments are allowed.
        if !saw_key {
            return None;
        }
        let continuation = line.starts_with([' ', '\t'])
            || trimmed == "-"
            || trimmed.starts_with("- ")
            || trimmed.starts_with('#');
        if !continuation {
            return None;
        }
    }

    None
}

/// Short name of a YAML value's kind, for messages.
#[must_use]
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Place a YAML error on the file line it refers to. The parser counts rows
/// from the start of the block, so its position suffix is replaced by the
/// column alone and the row becomes an absolute line.
fn yaml_error(err: &serde_saphyr::Error, start_line: usize, block_len: usize) -> ParseError {
    let text = err.to_string();
    let Some(location) = err.location() else {
        return ParseError::InvalidYaml {
            line: start_line,
            message: text,
        };
    };

    let suffix = format!(" at line {}, column {}", location.line(), location.column());
    let message = match text.strip_suffix(&suffix) {
        Some(base) => format!("{base} at column {}", location.column()),
        None => text,
    };
    let row = usize::try_from(location.line()).unwrap_or(usize::MAX);
    ParseError::InvalidYaml {
        line: start_line.saturating_add(row.clamp(1, block_len.max(1))),
        message,
    }
}

/// Parsed front matter of one sub-document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    /// Line of the opening `---` (1-indexed).
    pub start_line: usize,
    /// Line of the closing `---` (1-indexed).
    pub end_line: usize,
    /// Top-level fields.
    pub fields: BTreeMap<String, Value>,
    /// Line of every top-level key (1-indexed).
    pub key_lines: BTreeMap<String, usize>,
}

impl FrontMatter {
    /// Parse the lines between the delimiters. `start_line` is the 1-indexed
    /// line of the opening `---`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidYaml`] for malformed YAML and
    /// [`ParseError::NotAMapping`] when the block is not a key/value map.
    pub fn from_lines(lines: &[&str], start_line: usize) -> Result<Self, ParseError> {
        let end_line = start_line + lines.len() + 1;

        let mut key_lines = BTreeMap::new();
        for (offset, line) in lines.iter().enumerate() {
            if let Some(caps) = KEY_LINE_PATTERN.captures(line) {
                key_lines
                    .entry(caps[1].to_owned())
                    .or_insert(start_line + 1 + offset);
            }
        }

        let block = lines.join("\n");
        let fields = if block.trim().is_empty() {
            BTreeMap::new()
        } else {
            let value: Value = serde_saphyr::from_str(&block)
                .map_err(|e| yaml_error(&e, start_line, lines.len()))?;
            match value {
                Value::Object(map) => map.into_iter().collect(),
                Value::Null => BTreeMap::new(),
                other => {
                    return Err(ParseError::NotAMapping {
                        line: start_line,
                        found: value_kind(&other),
                    });
                }
            }
        };

        Ok(Self {
            start_line,
            end_line,
            fields,
            key_lines,
        })
    }

    /// Parse a block given as text (without delimiters).
    ///
    /// # Errors
    ///
    /// See [`FrontMatter::from_lines`].
    pub fn parse(block: &str, start_line: usize) -> Result<Self, ParseError> {
        let lines: Vec<&str> = block.lines().collect();
        Self::from_lines(&lines, start_line)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Trimmed, non-empty `canonical` value.
    #[must_use]
    pub fn canonical(&self) -> Option<&str> {
        self.get_str("canonical")
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// `nav_weight` when it is a positive integer.
    #[must_use]
    pub fn nav_weight(&self) -> Option<u64> {
        self.get("nav_weight")
            .and_then(Value::as_u64)
            .filter(|w| *w > 0)
    }

    /// Line of `key`, or the opening delimiter when the key is absent.
    #[must_use]
    pub fn line_of(&self, key: &str) -> usize {
        self.key_lines.get(key).copied().unwrap_or(self.start_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(content: &str) -> Vec<&str> {
        content.lines().collect()
    }

    #[test]
    fn test_parse_front_matter_fields_and_lines() {
        let block = "title: \"Atoms\"\ncanonical: \"https://example.com/1/21/atoms/\"\ntags:\n  - clojure\n  - state\nnav_weight: 3\ndate: 2024-05-01";
        let fm = FrontMatter::parse(block, 1).unwrap();
        assert_eq!(fm.get_str("title"), Some("Atoms"));
        assert_eq!(fm.canonical(), Some("https://example.com/1/21/atoms/"));
        assert_eq!(fm.nav_weight(), Some(3));
        assert_eq!(fm.get_str("date"), Some("2024-05-01"));
        assert_eq!(fm.get("tags").and_then(Value::as_array).map(Vec::len), Some(2));
        assert_eq!(fm.line_of("title"), 2);
        assert_eq!(fm.line_of("nav_weight"), 7);
        assert_eq!(fm.line_of("missing"), 1);
        assert_eq!(fm.end_line, 9);
    }

    #[test]
    fn test_parse_empty_front_matter() {
        let fm = FrontMatter::parse("", 1).unwrap();
        assert!(fm.fields.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = FrontMatter::parse("title: [unclosed", 4).unwrap_err();
        assert!(matches!(err, ParseError::InvalidYaml { .. }));
        assert!((4..=5).contains(&err.line()), "{err:?}");
    }

    #[test]
    fn test_invalid_yaml_position_is_absolute() {
        let block = "title: \"Atoms\"\ncanonical: \"https://example.com/a/\"\ntags: [clojure\nnav_weight: 1";
        let err = FrontMatter::parse(block, 30).unwrap_err();
        let ParseError::InvalidYaml { line, message } = &err else {
            panic!("expected InvalidYaml, got {err:?}");
        };
        // Block lines are 31..=34; the message carries no block-relative row.
        assert!((30..=34).contains(line), "{err:?}");
        assert!(!message.contains("at line"), "{message}");
    }

    #[test]
    fn test_parse_not_a_mapping() {
        let err = FrontMatter::parse("- a\n- b", 1).unwrap_err();
        assert_eq!(
            err,
            ParseError::NotAMapping {
                line: 1,
                found: "a list"
            }
        );
    }

    #[test]
    fn test_split_missing_front_matter() {
        let content = lines("# Title\n\nbody\n");
        assert_eq!(
            split_sub_documents(&content),
            Err(ParseError::MissingFrontMatter)
        );
        assert_eq!(split_sub_documents(&[]), Err(ParseError::MissingFrontMatter));
    }

    #[test]
    fn test_split_unterminated_front_matter() {
        let content = lines("---\ntitle: x\n\nbody\n");
        assert_eq!(
            split_sub_documents(&content),
            Err(ParseError::UnterminatedFrontMatter { line: 1 })
        );
    }

    #[test]
    fn test_split_single_document_keeps_thematic_breaks() {
        let content = lines("---\ntitle: A\n---\n\nPara\n\n---\n\nMore prose\n\n---\nend\n");
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(
            spans,
            vec![SubDocumentSpan {
                open: 0,
                close: 2,
                end: content.len()
            }]
        );
    }

    #[test]
    fn test_split_concatenated_articles() {
        let content = lines(concat!(
            "---\n",
            "title: First\n",
            "---\n",
            "Body one\n",
            "{{< quizdown >}}\n",
            "### Q\n",
            "- [x] a\n",
            "{{< /quizdown >}}\n",
            "---\n",
            "title: Second\n",
            "canonical: \"https://example.com/b/\"\n",
            "---\n",
            "Body two\n",
        ));
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], SubDocumentSpan { open: 0, close: 2, end: 8 });
        assert_eq!(spans[1], SubDocumentSpan { open: 8, close: 11, end: 13 });
        assert_eq!(spans[1].body_start(), 12);
    }

    #[test]
    fn test_split_ignores_front_matter_inside_code_and_quiz() {
        let content = lines(concat!(
            "---\n",
            "title: Outer\n",
            "---\n",
            "```yaml\n",
            "---\n",
            "title: Example\n",
            "---\n",
            "```\n",
            "{{< quizdown >}}\n",
            "---\n",
            "shuffle_answers: false\n",
            "title: not a document\n",
            "---\n",
            "### Q\n",
            "- [x] a\n",
            "{{< /quizdown >}}\n",
        ));
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_split_after_unterminated_quiz() {
        let content = lines(concat!(
            "---\n",
            "title: First\n",
            "---\n",
            "{{< quizdown >}}\n",
            "### Q\n",
            "- [x] a\n",
            "---\n",
            "title: Second\n",
            "---\n",
            "{{< quizdown >}}\n",
            "### Q\n",
            "- [x] a\n",
            "{{< /quizdown >}}\n",
        ));
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], SubDocumentSpan { open: 0, close: 2, end: 6 });
        assert_eq!(spans[1], SubDocumentSpan { open: 6, close: 8, end: 13 });
    }

    #[test]
    fn test_split_after_unterminated_fence() {
        let content = lines(concat!(
            "---\n",
            "title: First\n",
            "---\n",
            "```clojure\n",
            "(def x 1)\n",
            "---\n",
            "title: Second\n",
            "---\n",
            "Body two\n",
        ));
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].open, 5);
    }

    #[test]
    fn test_recognize_requires_known_key() {
        let content = lines("---\ntitle: A\n---\n---\nauthor: someone\n---\n");
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_recognize_rejects_prose_between_rules() {
        let content = lines("---\ntitle: A\n---\n---\ntitle: looks like a key\nbut this is prose\n---\n");
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn test_split_with_bom() {
        let content = lines("\u{feff}---\ntitle: A\n---\nbody\n");
        let spans = split_sub_documents(&content).unwrap();
        assert_eq!(spans.len(), 1);
    }
}
