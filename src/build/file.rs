//! File handles.
//!
//! A [`File`] is a path relative to a root directory. Keeping the two
//! apart lets a step rebase a source file into the output tree while
//! preserving its relative location (`<root>/libs/ui/a.ts` becomes
//! `<dist>/libs/ui/a.ts`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::fs::{lexical_normalize, relative_path};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct File {
    root: PathBuf,
    path: PathBuf,
    #[serde(default)]
    is_directory: bool,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        File {
            root: root.into(),
            path: path.into(),
            is_directory: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        File {
            root: root.into(),
            path: path.into(),
            is_directory: true,
        }
    }

    /// The same relative path under a different root.
    pub fn rebase(&self, root: impl Into<PathBuf>) -> Self {
        File {
            root: root.into(),
            path: self.path.clone(),
            is_directory: self.is_directory,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to [`root`](Self::root).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    pub fn absolute_path(&self) -> PathBuf {
        lexical_normalize(&self.root.join(&self.path))
    }

    /// Directory containing the file, absolute.
    pub fn absolute_directory(&self) -> PathBuf {
        let absolute = self.absolute_path();
        match absolute.parent() {
            Some(parent) => parent.to_path_buf(),
            None => absolute,
        }
    }

    /// Directory containing the file, relative to the root.
    pub fn parent_directory(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    pub fn path_relative_to(&self, root: &Path) -> PathBuf {
        if self.root == root {
            return self.path.clone();
        }
        relative_path(root, &self.absolute_path())
    }
}
