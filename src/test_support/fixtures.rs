//! Test fixtures for common test scenarios.
//!
//! [`WorkspaceFixture`] lays out a workspace in a temporary directory;
//! [`configs`] has project config snippets for the usual shapes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::core::manifest::{generate_workspace_manifest, DEFAULT_PROJECT_CONFIG_NAME, WORKSPACE_CONFIG_NAME};
use crate::core::plugin::PluginRegistry;
use crate::core::workspace::Workspace;

/// A workspace on disk, removed when dropped.
///
/// ```rust,ignore
/// let fixture = WorkspaceFixture::new()
///     .project("libs/util", "build = \"copy\"\n")
///     .file("libs/util/index.ts", "export const one = 1;\n");
/// let ws = fixture.workspace();
/// ```
#[derive(Debug)]
pub struct WorkspaceFixture {
    _dir: TempDir,
    root: PathBuf,
}

impl WorkspaceFixture {
    /// A workspace with the default `Keel.toml`.
    pub fn new() -> Self {
        Self::with_config(&generate_workspace_manifest())
    }

    /// A workspace whose `Keel.toml` is `config`.
    pub fn with_config(config: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir
            .path()
            .canonicalize()
            .expect("failed to canonicalize temp dir");
        let fixture = WorkspaceFixture { _dir: dir, root };
        fixture.write(WORKSPACE_CONFIG_NAME, config);
        fixture
    }

    /// Add a project at `path` with `config` as its `Project.toml`.
    pub fn project(self, path: &str, config: &str) -> Self {
        self.write(&format!("{}/{}", path, DEFAULT_PROJECT_CONFIG_NAME), config);
        self
    }

    /// Add a file at `path`, relative to the workspace root.
    pub fn file(self, path: &str, content: &str) -> Self {
        self.write(path, content);
        self
    }

    fn write(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        std::fs::write(&full_path, content).expect("failed to write fixture file");
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(WORKSPACE_CONFIG_NAME)
    }

    /// Load through the shared workspace cache.
    pub fn workspace(&self) -> Arc<Workspace> {
        Workspace::load(&self.config_file()).expect("failed to load fixture workspace")
    }

    /// A fresh, uncached workspace with the built-in plugins registered,
    /// open to further registrations.
    pub fn workspace_unloaded(&self) -> Workspace {
        Workspace::load_with(&self.config_file(), &PluginRegistry::builtin())
            .expect("failed to load fixture workspace")
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Project config snippets.
pub mod configs {
    /// A `copy` project with the given `[deps]`.
    pub fn copy_project(deps: &[(&str, &str)]) -> String {
        let mut config = String::from("build = \"copy\"\n");
        if !deps.is_empty() {
            config.push_str("\n[deps]\n");
            for (name, kind) in deps {
                config.push_str(&format!("\"{}\" = \"{}\"\n", name, kind));
            }
        }
        config
    }

    /// A `copy` project with a `files` target named `target`.
    pub fn copy_with_target(target: &str, deps: &[(&str, &str)]) -> String {
        format!("{}\n[targets.{}]\nbundle = \"files\"\n", copy_project(deps), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let fixture = WorkspaceFixture::new()
            .project("libs/a", &configs::copy_project(&[("//libs/b", "build")]))
            .file("libs/a/index.ts", "");
        assert!(fixture.config_file().is_file());
        assert!(fixture.root().join("libs/a/Project.toml").is_file());

        let ws = fixture.workspace();
        let project = ws.load_project("libs/a").unwrap();
        assert_eq!(project.dependencies.build, ["//libs/b"]);
    }
}
