//! Implementation of `keel init`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::core::manifest::{generate_workspace_manifest, DEFAULT_DIST_DIR, DEFAULT_META_DIR, WORKSPACE_CONFIG_NAME};
use crate::util::fs;

/// Create a workspace at `path`: a `Keel.toml`, the metadata directory and
/// a `.gitignore` entry for the output directory. Returns the config path.
pub fn init_workspace(path: &Path) -> Result<PathBuf> {
    let config_file = path.join(WORKSPACE_CONFIG_NAME);
    if config_file.exists() {
        bail!("`{}` already exists", config_file.display());
    }

    fs::write_string(&config_file, &generate_workspace_manifest())?;
    fs::ensure_dir(&path.join(DEFAULT_META_DIR))?;
    ignore_output_dir(path)?;

    Ok(config_file)
}

fn ignore_output_dir(path: &Path) -> Result<()> {
    let gitignore = path.join(".gitignore");
    let entry = format!("/{}/", DEFAULT_DIST_DIR);

    let mut content = if gitignore.exists() {
        fs::read_to_string(&gitignore)?
    } else {
        String::new()
    };
    if content.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&entry);
    content.push('\n');
    fs::write_string(&gitignore, &content)
}
