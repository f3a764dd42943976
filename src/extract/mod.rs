//! Static dependency extraction.
//!
//! Builders may expose a [`DependencyExtractor`] that reads a project's
//! sources and reports what it references. The result keeps `[deps]`
//! accurate (see `ops::keel_fix`) and distinguishes references needed at
//! runtime (`build`) from every reference (`lint`).

pub mod imports;
pub mod resolve;
pub mod scan;

use std::path::Path;

use anyhow::Result;

use crate::build::file::File;
use crate::core::dependency::Dependency;
use crate::core::project::Project;
use crate::core::workspace::Workspace;

pub use imports::ImportExtractor;
pub use resolve::{ModuleResolver, Resolved};
pub use scan::{scan, ImportKind, ImportRef};

pub struct ExtractRequest<'a> {
    pub workspace: &'a Workspace,
    pub project: &'a Project,
    /// Source files, rooted at the workspace root.
    pub sources: &'a [File],
}

pub trait DependencyExtractor: Send + Sync {
    /// Dependencies of `req.project`, sorted by value. Every entry has
    /// `lint` set; `build` entries are a subset.
    fn extract(&self, req: &ExtractRequest<'_>) -> Result<Vec<Dependency>>;
}

/// Run the extractor of `project`'s builder over its sources.
///
/// `None` when the project has no builder or the builder has no extractor.
pub fn extract_project(workspace: &Workspace, project: &Project) -> Result<Option<Vec<Dependency>>> {
    if project.build.is_none() {
        return Ok(None);
    }
    let builder = workspace.get_builder(project)?;
    let Some(extractor) = builder.extractor() else {
        return Ok(None);
    };

    let files = project.collect_files(workspace.project_config_filename())?;
    let sources: Vec<File> = files
        .sources
        .iter()
        .map(|source| File::new(Path::new(&project.name).join(source), workspace.root()))
        .collect();

    extractor
        .extract(&ExtractRequest {
            workspace,
            project,
            sources: &sources,
        })
        .map(Some)
}
