//! Global context for keel operations.
//!
//! Holds the process-level state the CLI needs before a workspace is
//! loaded: the working directory, output preferences and where engine
//! configuration lives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::errors::ConfigError;
use crate::core::workspace::{find_workspace_config, Workspace};
use crate::util::config::{global_config_path, load_config, workspace_config_path, Config};

#[derive(Debug, Clone)]
pub struct GlobalContext {
    cwd: PathBuf,

    /// Global config file, if a home directory is known.
    global_config: Option<PathBuf>,

    verbose: bool,

    color: bool,
}

impl GlobalContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(GlobalContext {
            cwd,
            global_config: global_config_path(),
            verbose: false,
            color: true,
        })
    }

    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let mut ctx = Self::new()?;
        ctx.cwd = cwd;
        Ok(ctx)
    }

    /// Read global settings from `path` instead of `~/.keel/config.toml`.
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Resolve `path` against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// `Keel.toml` of the workspace enclosing the working directory.
    pub fn find_workspace_config(&self) -> Result<PathBuf, ConfigError> {
        find_workspace_config(&self.cwd)
    }

    pub fn workspace(&self) -> Result<Arc<Workspace>, ConfigError> {
        Workspace::find(&self.cwd)
    }

    /// Engine settings for `workspace`: global config overridden by the
    /// workspace's `<meta-dir>/config.toml`.
    pub fn config(&self, workspace: &Workspace) -> Config {
        load_config(
            self.global_config.as_deref(),
            &workspace_config_path(workspace.meta_dir()),
        )
    }
}
