//! Implementation of `keel fix` and `keel deps`.
//!
//! Dependencies are extracted from every project's sources and written
//! back to the `[deps]` table of its config. The rest of the file is left
//! untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use toml_edit::{value, DocumentMut, Item, Table};

use crate::core::dependency::Dependencies;
use crate::core::project::Project;
use crate::core::workspace::Workspace;
use crate::extract::extract_project;
use crate::util::fs;

#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Report drift without writing.
    pub check: bool,
}

/// A project whose declared dependencies differ from what its sources use.
#[derive(Debug, Clone)]
pub struct ProjectDrift {
    pub project: String,
    pub config_file: PathBuf,
    pub declared: Dependencies,
    pub extracted: Dependencies,
}

impl ProjectDrift {
    /// `(name, kind)` entries present after the fix but not before.
    pub fn added(&self) -> Vec<(String, &'static str)> {
        let before = self.declared.to_map();
        self.extracted
            .to_map()
            .into_iter()
            .filter(|(name, kind)| before.get(name) != Some(kind))
            .map(|(name, kind)| (name, kind.as_str()))
            .collect()
    }

    /// Names declared before the fix that are gone after it.
    pub fn removed(&self) -> Vec<String> {
        let after = self.extracted.to_map();
        self.declared
            .to_map()
            .into_keys()
            .filter(|name| !after.contains_key(name))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct FixReport {
    /// Projects whose dependencies were extracted.
    pub checked: usize,
    /// Sorted by project name.
    pub drift: Vec<ProjectDrift>,
    /// Whether `drift` was written back.
    pub written: bool,
}

impl FixReport {
    pub fn is_clean(&self) -> bool {
        self.drift.is_empty()
    }
}

/// Extracted dependencies of `project`, or `None` when its builder does
/// not support extraction.
pub fn extracted_dependencies(workspace: &Workspace, project: &Project) -> Result<Option<Dependencies>> {
    let extracted = extract_project(workspace, project)
        .with_context(|| format!("failed to extract dependencies of `{}`", project.name))?;
    Ok(extracted.map(|deps| Dependencies::from_extracted(&deps)))
}

pub fn fix(workspace: &Workspace, opts: &FixOptions) -> Result<FixReport> {
    let projects = workspace.load_all_projects()?;

    let results: Vec<Option<ProjectDrift>> = projects
        .par_iter()
        .map(|project| -> Result<Option<ProjectDrift>> {
            let Some(extracted) = extracted_dependencies(workspace, project)? else {
                return Ok(None);
            };
            Ok(Some(ProjectDrift {
                project: project.name.clone(),
                config_file: project.config_file.clone(),
                declared: project.dependencies.clone(),
                extracted,
            }))
        })
        .collect::<Result<_>>()?;

    let checked: Vec<ProjectDrift> = results.into_iter().flatten().collect();
    let mut report = FixReport {
        checked: checked.len(),
        drift: checked
            .into_iter()
            .filter(|d| d.declared.to_map() != d.extracted.to_map())
            .collect(),
        written: false,
    };

    if !opts.check {
        for drift in &report.drift {
            write_dependencies(&drift.config_file, &drift.extracted)?;
            tracing::info!("updated dependencies of `{}`", drift.project);
        }
        report.written = !report.drift.is_empty();
    }

    Ok(report)
}

/// Replace the `[deps]` table of the config at `config_file`.
pub fn write_dependencies(config_file: &Path, deps: &Dependencies) -> Result<()> {
    let content = fs::read_to_string(config_file)?;
    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("failed to parse {}", config_file.display()))?;

    let map = deps.to_map();
    if map.is_empty() {
        doc.remove("deps");
    } else {
        let mut table = Table::new();
        for (name, kind) in map {
            table.insert(&name, value(kind.as_str()));
        }
        doc["deps"] = Item::Table(table);
    }

    fs::write_string(config_file, &doc.to_string())
}
