//! Filesystem validation source.
//!
//! Discovers content files on disk and reads them safely for the pipeline.
//! Security properties enforced here:
//! - Symlinks are not followed by default (`follow_links: false`)
//! - Resolved paths are checked to remain within the scan root
//! - Device files, pipes, and sockets are skipped
//! - Maximum directory depth is enforced to prevent infinite recursion
//! - Bounded streaming reads prevent TOCTOU and memory `DoS`

use std::io::Read;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::FsSourceConfig;
use crate::error::{FatalError, Issue, IssueKind};

/// Directories to skip: VCS metadata, build output and generated site files.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "public",
    "resources",
];

/// Check if a path matches any of the exclude patterns
fn matches_exclude(path: &Path, exclude_patterns: &[Pattern]) -> bool {
    let path_str = path.to_string_lossy();
    exclude_patterns.iter().any(|pattern| {
        pattern.matches(&path_str)
            || path
                .file_name()
                .is_some_and(|name| pattern.matches(&name.to_string_lossy()))
    })
}

/// Returns `true` if the entry should be **included** (i.e., is NOT a skip dir).
fn is_not_skip_dir(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() > 0
        && entry.file_type().is_dir()
        && let Some(name) = entry.file_name().to_str()
    {
        return !SKIP_DIRS.contains(&name);
    }
    true
}

/// Check if file has one of the configured extensions.
fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Pattern>, FatalError> {
    patterns
        .iter()
        .map(|pat_str| {
            Pattern::new(pat_str).map_err(|e| FatalError::InvalidExcludePattern {
                pattern: pat_str.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Find all files to scan in the configured paths.
///
/// Returns `(files, issues)`:
/// - `files`: sorted, deduplicated paths that passed all filters.
/// - `issues`: walk errors and boundary violations. These are never
///   silently discarded.
///
/// # Errors
///
/// Returns [`FatalError`] if an exclude pattern is invalid or a root
/// cannot be resolved or listed.
pub fn find_files(config: &FsSourceConfig) -> Result<(Vec<PathBuf>, Vec<Issue>), FatalError> {
    let mut files = Vec::new();
    let mut issues = Vec::new();
    let exclude_patterns = compile_excludes(&config.exclude)?;

    for root in &config.paths {
        // Canonicalize the root once so we can enforce the boundary for every entry.
        let canonical_root = root
            .canonicalize()
            .map_err(|source| FatalError::RootUnreadable {
                path: root.clone(),
                source,
            })?;

        if root.is_file() {
            if matches_extension(root, &config.extensions)
                && !matches_exclude(root, &exclude_patterns)
            {
                files.push(root.clone());
            }
            continue;
        }

        if !root.is_dir() {
            continue;
        }
        if let Err(source) = std::fs::read_dir(root) {
            return Err(FatalError::RootUnreadable {
                path: root.clone(),
                source,
            });
        }

        for entry_result in WalkDir::new(root)
            .follow_links(config.follow_links)
            .max_depth(config.max_depth)
            .into_iter()
            .filter_entry(is_not_skip_dir)
        {
            let entry = match entry_result {
                Ok(e) => e,
                Err(walk_err) => {
                    let path = walk_err
                        .path()
                        .map_or_else(|| root.clone(), Path::to_path_buf);
                    issues.push(Issue::error(
                        path,
                        0,
                        IssueKind::WalkError,
                        format!("directory traversal error: {walk_err}"),
                    ));
                    continue;
                }
            };

            let file_path = entry.path();

            if !file_path.is_file() || !matches_extension(file_path, &config.extensions) {
                continue;
            }

            // Enforce the root boundary even when follow_links is true.
            match file_path.canonicalize() {
                Ok(canonical_path) => {
                    if !canonical_path.starts_with(&canonical_root) {
                        issues.push(Issue::error(
                            file_path,
                            0,
                            IssueKind::OutsideRoot,
                            format!(
                                "path resolves outside the scan root: {} -> {}",
                                file_path.display(),
                                canonical_path.display()
                            ),
                        ));
                        continue;
                    }
                }
                Err(e) => {
                    issues.push(Issue::error(
                        file_path,
                        0,
                        IssueKind::Io,
                        format!("failed to canonicalize path: {e}"),
                    ));
                    continue;
                }
            }

            // Skip devices, pipes, sockets: only regular files
            #[cfg(unix)]
            {
                use std::os::unix::fs::FileTypeExt;
                if let Ok(ft) = entry.metadata().map(|m| m.file_type())
                    && (ft.is_block_device()
                        || ft.is_char_device()
                        || ft.is_fifo()
                        || ft.is_socket())
                {
                    continue;
                }
            }

            if matches_exclude(file_path, &exclude_patterns) {
                debug!(file = %file_path.display(), "excluded by pattern");
                continue;
            }

            files.push(file_path.to_path_buf());
        }
    }

    files.sort();
    files.dedup();
    Ok((files, issues))
}

/// Read a file using a bounded streaming read, enforcing `max_file_size`.
///
/// Uses `Read::take` so the size check and the read are the same
/// operation; never calls `read_to_string` on an unbounded handle.
///
/// # Errors
///
/// Returns an error-severity [`Issue`] if the file exceeds
/// `max_file_size`, an I/O error occurs, or the content is not UTF-8.
pub fn read_file_bounded(path: &Path, max_file_size: u64) -> Result<String, Issue> {
    let file = std::fs::File::open(path).map_err(|e| {
        Issue::error(path, 0, IssueKind::Io, format!("failed to open file: {e}"))
    })?;

    // Read at most max_file_size + 1 bytes to detect oversized files
    let mut buffer = Vec::new();
    file.take(max_file_size.saturating_add(1))
        .read_to_end(&mut buffer)
        .map_err(|e| Issue::error(path, 0, IssueKind::Io, format!("failed to read file: {e}")))?;

    if buffer.len() as u64 > max_file_size {
        return Err(Issue::error(
            path,
            0,
            IssueKind::FileTooLarge,
            format!("file exceeds maximum size of {max_file_size} bytes"),
        ));
    }

    String::from_utf8(buffer).map_err(|_| {
        Issue::error(
            path,
            0,
            IssueKind::InvalidEncoding,
            "file is not valid UTF-8",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> FsSourceConfig {
        let mut cfg = FsSourceConfig::default();
        cfg.paths = vec![root.to_path_buf()];
        cfg
    }

    #[test]
    fn test_find_files_filters_extensions_and_skip_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "x").unwrap();
        fs::write(tmp.path().join("b.mdx"), "x").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("public")).unwrap();
        fs::write(tmp.path().join("public").join("rendered.md"), "x").unwrap();
        fs::create_dir(tmp.path().join("chapter")).unwrap();
        fs::write(tmp.path().join("chapter").join("c.markdown"), "x").unwrap();

        let (files, issues) = find_files(&config_for(tmp.path())).unwrap();
        assert!(issues.is_empty(), "{issues:?}");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.mdx", "c.markdown"]);
    }

    #[test]
    fn test_find_files_exclude_pattern() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.md"), "x").unwrap();
        fs::write(tmp.path().join("draft.md"), "x").unwrap();
        let mut cfg = config_for(tmp.path());
        cfg.exclude = vec!["draft*".to_owned()];
        let (files, _) = find_files(&cfg).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.md"));
    }

    #[test]
    fn test_find_files_invalid_exclude_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config_for(tmp.path());
        cfg.exclude = vec!["[unclosed".to_owned()];
        assert!(matches!(
            find_files(&cfg),
            Err(FatalError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_read_file_bounded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.md");
        fs::write(&path, "0123456789").unwrap();

        assert_eq!(read_file_bounded(&path, 10).unwrap(), "0123456789");
        let too_large = read_file_bounded(&path, 9).unwrap_err();
        assert_eq!(too_large.kind, IssueKind::FileTooLarge);

        let binary = tmp.path().join("b.md");
        fs::write(&binary, [0xFF, 0xFE, 0x00]).unwrap();
        assert_eq!(
            read_file_bounded(&binary, 100).unwrap_err().kind,
            IssueKind::InvalidEncoding
        );

        let missing = read_file_bounded(&tmp.path().join("missing.md"), 100).unwrap_err();
        assert_eq!(missing.kind, IssueKind::Io);
    }
}
