//! Implementation of `keel run`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::core::label::Label;
use crate::core::workspace::Workspace;
use crate::ops::keel_build::{build, BuildOptions, BuildResult};
use crate::util::fs::to_slash;
use crate::util::process::ProcessBuilder;

/// The executable `label` provides: the first one its own step produced.
pub fn executable_of(result: &BuildResult, label: Label) -> Result<&Path> {
    result
        .executables
        .get(&label)
        .and_then(|paths| paths.first())
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("cannot find an executable for {}", label))
}

/// Build `label`, then run its executable with `args` from `cwd`.
///
/// A failed build is returned as is and nothing runs; the caller decides how
/// to report it. A program that exits unsuccessfully is an error.
pub async fn run(
    workspace: Arc<Workspace>,
    label: Label,
    args: &[String],
    cwd: &Path,
    options: &BuildOptions,
) -> Result<BuildResult> {
    let result = build(Arc::clone(&workspace), &[label], options).await?;
    if !result.is_success() {
        return Ok(result);
    }

    let executable = executable_of(&result, label)?;
    tracing::info!(
        "running {}",
        to_slash(executable.strip_prefix(workspace.root()).unwrap_or(executable))
    );
    ProcessBuilder::new(executable)
        .args(args)
        .cwd(cwd)
        .env("KEEL_ROOT", to_slash(workspace.root()))
        .run_inherited()
        .await?;
    Ok(result)
}
