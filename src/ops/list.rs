//! Implementation of `keel list`.

use anyhow::Result;

use crate::core::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListKind {
    #[default]
    Projects,
    Targets,
}

/// Sorted project names, or sorted target display names.
pub fn list(workspace: &Workspace, kind: ListKind) -> Result<Vec<String>> {
    let projects = workspace.load_all_projects()?;

    let mut names: Vec<String> = match kind {
        ListKind::Projects => projects.iter().map(|p| p.name.clone()).collect(),
        ListKind::Targets => projects
            .iter()
            .flat_map(|p| p.targets.values().map(|t| t.display_name()))
            .collect(),
    };
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::WorkspaceFixture;

    #[test]
    fn test_list() {
        let fixture = WorkspaceFixture::new()
            .project("libs/ui", "build = \"copy\"\n")
            .project(
                "apps/web",
                "build = \"copy\"\n[targets.web]\nbundle = \"files\"\n[targets.storybook]\nbundle = \"files\"\n",
            );
        let ws = fixture.workspace();

        assert_eq!(list(&ws, ListKind::Projects).unwrap(), ["apps/web", "libs/ui"]);
        assert_eq!(
            list(&ws, ListKind::Targets).unwrap(),
            ["apps/web", "apps/web:storybook"]
        );
    }

    #[test]
    fn test_dist_dir_is_not_scanned() {
        let fixture = WorkspaceFixture::new()
            .project("libs/ui", "build = \"copy\"\n")
            .file("dist/libs/ui/Project.toml", "build = \"copy\"\n");
        let ws = fixture.workspace();
        assert_eq!(list(&ws, ListKind::Projects).unwrap(), ["libs/ui"]);
    }
}
