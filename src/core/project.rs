//! Projects - one buildable unit of the workspace.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::dependency::Dependencies;
use crate::core::errors::ConfigError;
use crate::core::label::Label;
use crate::core::manifest::{asset_glob, source_glob, ProjectManifest, ResolvedConfig};
use crate::core::target::Target;
use crate::core::workspace::Workspace;
use crate::util::fs::{relative_path, to_slash, walk_glob, GlobSpec};

/// Source and asset selection of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    pub sources: GlobSpec,
    pub assets: GlobSpec,
}

/// Files of a project, relative to its root directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedFiles {
    pub sources: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Project {
    /// Path of the project directory relative to the workspace root, with
    /// `/` separators.
    pub name: String,

    pub root_dir: PathBuf,

    pub config_file: PathBuf,

    /// `<dist-dir>/<name>`
    pub dist_dir: PathBuf,

    pub build: Option<ResolvedConfig>,

    pub test: bool,

    pub dependencies: Dependencies,

    pub files: ProjectFiles,

    pub targets: BTreeMap<String, Arc<Target>>,

    /// The config file as written.
    pub raw: toml::Table,
}

impl Project {
    /// Parse the project config at `config_file`, run the project hooks,
    /// then build and hook every target.
    pub(crate) fn load(workspace: &Workspace, config_file: &Path) -> Result<Self, ConfigError> {
        let (manifest, raw) = ProjectManifest::load(config_file)?;

        let root_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace.root().to_path_buf());
        let name = to_slash(&relative_path(workspace.root(), &root_dir));
        if name.is_empty() || name.starts_with("..") {
            return Err(ConfigError::invalid(
                config_file,
                "project configs must live in a subdirectory of the workspace root",
            ));
        }

        let defaults = workspace.defaults();
        let mut project = Project {
            dist_dir: workspace.dist_dir().join(&name),
            name,
            root_dir,
            config_file: config_file.to_path_buf(),
            build: manifest.build.as_ref().map(|b| b.resolve(&defaults.build)),
            test: manifest.test,
            dependencies: Dependencies::from_map(&manifest.deps),
            files: ProjectFiles {
                sources: source_glob(manifest.srcs.as_ref()),
                assets: asset_glob(manifest.assets.as_ref()),
            },
            targets: BTreeMap::new(),
            raw,
        };

        workspace.run_project_hooks(&mut project);

        if let Some(ref build) = project.build {
            if let Ok(builder) = workspace.get_builder(&project) {
                builder
                    .validate_config(&build.config)
                    .map_err(|message| ConfigError::invalid(config_file, message))?;
            }
        }

        for (target_name, target_manifest) in &manifest.targets {
            let mut target = Target::from_manifest(
                target_name,
                &project.name,
                target_manifest,
                &defaults.bundle,
                config_file,
            )?;
            workspace.run_target_hooks(&mut target);

            if let Ok(bundler) = workspace.get_bundler(&target) {
                bundler
                    .validate_config(&target.bundle.config)
                    .map_err(|message| ConfigError::invalid(config_file, message))?;
            }

            project
                .targets
                .insert(target_name.clone(), Arc::new(target));
        }

        tracing::debug!(
            "loaded project `{}` ({} targets)",
            project.name,
            project.targets.len()
        );

        Ok(project)
    }

    pub fn label(&self) -> Label {
        Label::new(&self.name, None)
    }

    /// The build type, if any.
    pub fn build_kind(&self) -> Option<&str> {
        self.build.as_ref().map(|b| b.kind.as_str())
    }

    pub fn target(&self, name: &str) -> Result<&Arc<Target>, ConfigError> {
        self.targets
            .get(name)
            .ok_or_else(|| ConfigError::TargetNotFound {
                project: self.name.clone(),
                target: name.to_string(),
            })
    }

    pub fn default_target(&self) -> Option<&Arc<Target>> {
        self.targets.values().find(|t| t.is_default)
    }

    /// Glob the project's sources and assets. Directories holding another
    /// project config are skipped, the project's own config is never a
    /// source, and sources are removed from assets.
    pub fn collect_files(&self, project_config_filename: &str) -> Result<CollectedFiles> {
        let nested = |dir: &Path| dir.join(project_config_filename).is_file();

        let sources: Vec<PathBuf> = walk_glob(&self.root_dir, &self.files.sources, nested)?
            .into_iter()
            .filter(|source| source.as_path() != Path::new(project_config_filename))
            .collect();
        let assets = walk_glob(&self.root_dir, &self.files.assets, nested)?;

        let claimed: BTreeSet<&PathBuf> = sources.iter().collect();
        let assets = assets
            .into_iter()
            .filter(|asset| !claimed.contains(asset))
            .collect();

        Ok(CollectedFiles { sources, assets })
    }
}
