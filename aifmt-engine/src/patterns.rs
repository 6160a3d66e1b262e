//! Expansion of command-line file patterns.
//!
//! Shell-style wildcards (`*`, `?`, `[...]`, `{a,b}`) match within a single
//! path component. A pattern without wildcards names one file.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::PatternError;

fn has_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Split `pattern` into the literal directory to walk from and the components
/// from the first wildcard on. `.` components and repeated separators are
/// dropped, so `src//*.go` and `./src/*.go` resolve like `src/*.go`.
fn split_base(pattern: &str) -> (PathBuf, Vec<String>) {
    let mut base = PathBuf::new();
    let mut rest = Vec::new();
    for component in Path::new(pattern).components() {
        if component == Component::CurDir {
            continue;
        }
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !has_meta(&text) {
            base.push(component);
        } else {
            rest.push(text.into_owned());
        }
    }
    (base, rest)
}

fn compile(pattern: &str, glob: &str) -> Result<GlobMatcher, PatternError> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })
}

/// Regular files matched by `pattern`, in lexical order.
///
/// A pattern that matches nothing yields an empty list, not an error.
/// Unreadable directories below the base are skipped.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>, PatternError> {
    if !has_meta(pattern) {
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }

    let (base, rest) = split_base(pattern);
    // Matched against paths relative to the walk root.
    let matcher = compile(pattern, &rest.join("/"))?;

    let relative = base.as_os_str().is_empty();
    let root = if relative { PathBuf::from(".") } else { base };
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(&root).min_depth(rest.len()).max_depth(rest.len()) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(pattern, error = %err, "skipping unreadable entry");
                continue;
            }
        };
        // Follows symlinks for the final check.
        if !entry.path().is_file() {
            continue;
        }
        let Ok(below_root) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if !matcher.is_match(below_root) {
            continue;
        }
        matches.push(if relative {
            below_root.to_path_buf()
        } else {
            root.join(below_root)
        });
    }
    matches.sort();
    Ok(matches)
}

/// Expand every pattern in order and concatenate the results.
///
/// Malformed patterns are logged and contribute nothing. A file matched by
/// more than one pattern is kept once, at its first position.
pub fn expand_all(patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        match expand(pattern) {
            Ok(paths) => {
                if paths.is_empty() {
                    tracing::warn!(pattern = %pattern, "pattern matched no files");
                }
                for path in paths {
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
            }
            Err(err) => tracing::warn!(error = %err, "skipping malformed pattern"),
        }
    }
    files
}
