//! Implementation of `keel affected`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use anyhow::Result;

use crate::core::project::Project;
use crate::core::workspace::Workspace;

/// Project name -> projects listing it as a (lint) dependency.
fn inverse_dependencies(projects: &[std::sync::Arc<Project>]) -> BTreeMap<&str, Vec<&str>> {
    let names: BTreeSet<&str> = projects.iter().map(|p| p.name.as_str()).collect();
    let mut map: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for project in projects {
        for label in project.dependencies.lint_labels() {
            if let Some(dep) = names.get(label.project()) {
                map.entry(*dep).or_default().push(project.name.as_str());
            }
        }
    }
    map
}

/// Projects owning `files` plus every project depending on them,
/// transitively, sorted by name. Files outside any project are ignored.
pub fn affected(workspace: &Workspace, files: &[PathBuf]) -> Result<Vec<String>> {
    let owners: BTreeSet<String> = files
        .iter()
        .filter_map(|file| workspace.project_name_for_path(file))
        .collect();
    if owners.is_empty() {
        return Ok(Vec::new());
    }

    let projects = workspace.load_all_projects()?;
    let dependents = inverse_dependencies(&projects);

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = owners.into_iter().collect();
    while let Some(name) = queue.pop_front() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(next) = dependents.get(name.as_str()) {
            queue.extend(next.iter().map(|n| n.to_string()));
        }
    }

    Ok(seen.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{configs, WorkspaceFixture};

    fn fixture() -> WorkspaceFixture {
        WorkspaceFixture::new()
            .project("libs/types", &configs::copy_project(&[]))
            .file("libs/types/index.ts", "")
            .project("libs/ui", &configs::copy_project(&[("//libs/types", "lint")]))
            .file("libs/ui/button.ts", "")
            .project("apps/web", &configs::copy_project(&[("//libs/ui", "build")]))
            .project("apps/api", &configs::copy_project(&[("//libs/types", "build")]))
            .project("apps/docs", &configs::copy_project(&[("react", "build")]))
    }

    #[test]
    fn test_transitive_dependents() {
        let fixture = fixture();
        let ws = fixture.workspace();

        let names = affected(&ws, &[fixture.root().join("libs/types/index.ts")]).unwrap();
        assert_eq!(names, ["apps/api", "apps/web", "libs/types", "libs/ui"]);

        let names = affected(&ws, &[PathBuf::from("libs/ui/button.ts")]).unwrap();
        assert_eq!(names, ["apps/web", "libs/ui"]);
    }

    #[test]
    fn test_files_outside_projects() {
        let fixture = fixture().file("README.md", "");
        let ws = fixture.workspace();
        assert!(affected(&ws, &[PathBuf::from("README.md")]).unwrap().is_empty());
    }
}
