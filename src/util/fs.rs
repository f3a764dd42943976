//! Filesystem utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// Directories never descended into when collecting project files.
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[".git", "node_modules", "__generated__"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy `from` to `to`, creating the destination directory.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Remove a file or directory if it exists.
pub fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    result.with_context(|| format!("failed to remove {}", path.display()))
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| lexical_normalize(path))
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with `/` separators, as used in labels.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Include/exclude patterns for files and directories.
///
/// Patterns starting with `/` are anchored at the walk root, everything else
/// matches at any depth. Directory exclusion prunes the whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobSpec {
    pub include: PatternSet,
    pub exclude: PatternSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet {
    pub files: Vec<String>,
    pub directories: Vec<String>,
}

impl GlobSpec {
    /// Include `files`, skipping the default excluded directories.
    pub fn files(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        GlobSpec {
            include: PatternSet {
                files: files.into_iter().map(Into::into).collect(),
                directories: Vec::new(),
            },
            exclude: PatternSet {
                files: Vec::new(),
                directories: DEFAULT_EXCLUDED_DIRECTORIES
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            },
        }
    }
}

struct Matcher {
    patterns: Vec<Pattern>,
}

impl Matcher {
    fn new(patterns: &[String]) -> Result<Self> {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let trimmed = pattern.trim_end_matches('/');
            if let Some(anchored) = trimmed.strip_prefix('/') {
                compiled.push(compile(anchored)?);
            } else {
                compiled.push(compile(trimmed)?);
                compiled.push(compile(&format!("**/{}", trimmed))?);
            }
        }
        Ok(Matcher { patterns: compiled })
    }

    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn matches(&self, relative: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).with_context(|| format!("invalid glob pattern: {}", pattern))
}

/// Walk `root` and return the files selected by `spec`, relative to `root`,
/// sorted. `prune` can veto descending into a directory (given its absolute
/// path); the root itself is never pruned.
pub fn walk_glob(root: &Path, spec: &GlobSpec, prune: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let include_files = Matcher::new(&spec.include.files)?;
    let include_dirs = Matcher::new(&spec.include.directories)?;
    let exclude_files = Matcher::new(&spec.exclude.files)?;
    let exclude_dirs = Matcher::new(&spec.exclude.directories)?;

    if include_files.is_empty() || !root.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(root).follow_links(true).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let relative = to_slash(&relative_path(root, entry.path()));
        !exclude_dirs.matches(&relative) && !prune(entry.path())
    });

    let mut results = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path(root, entry.path());
        let slashed = to_slash(&relative);
        if !include_files.matches(&slashed) || exclude_files.matches(&slashed) {
            continue;
        }
        if !include_dirs.is_empty() && !in_included_directory(&relative, &include_dirs) {
            continue;
        }
        results.push(relative);
    }

    results.sort();
    Ok(results)
}

fn in_included_directory(relative: &Path, include_dirs: &Matcher) -> bool {
    relative
        .ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .any(|dir| include_dirs.matches(&to_slash(dir)))
}

/// Walk upward from `start` and return the first directory containing
/// `filename`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(filename).is_file())
        .map(Path::to_path_buf)
}
