//! Turning command line input into labels.

use std::path::Path;

use crate::core::errors::ConfigError;
use crate::core::label::Label;
use crate::core::workspace::Workspace;

/// Resolve `value` to a label.
///
/// An existing path (relative to `cwd`) selects the project owning it.
/// Anything else is read as `//project`, `//project:target`, `project` or
/// `project:target`; trailing slashes are ignored. The project, and the
/// target when one is named, must exist.
pub fn resolve_target(workspace: &Workspace, value: &str, cwd: &Path) -> Result<Label, ConfigError> {
    let path = cwd.join(value);
    if !value.starts_with("//") && path.exists() {
        let name = workspace
            .project_name_for_path(&path)
            .ok_or_else(|| ConfigError::ProjectNotFound {
                path: path.join(workspace.project_config_filename()),
            })?;
        return Ok(Label::new(&name, None));
    }

    let trimmed = value.trim_end_matches('/');
    let text = if trimmed.starts_with("//") {
        trimmed.to_string()
    } else {
        format!("//{}", trimmed)
    };
    let label = Label::parse(&text)?;

    if label.is_target() {
        workspace.load_target(label)?;
    } else {
        workspace.load_project(label.project())?;
    }
    Ok(label)
}
