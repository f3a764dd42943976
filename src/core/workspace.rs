//! Workspace - central configuration hub.
//!
//! A Workspace is the root directory holding `Keel.toml`, the registries
//! plugins contributed to, and a cache of the projects loaded from it.
//! Workspaces are loaded once per config file and shared behind `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use anyhow::Result;

use crate::core::errors::ConfigError;
use crate::core::label::Label;
use crate::core::manifest::{
    DefaultsSection, WorkspaceManifest, DEFAULT_DIST_DIR, DEFAULT_META_DIR,
    DEFAULT_PROJECT_CONFIG_NAME, WORKSPACE_CONFIG_NAME,
};
use crate::core::plugin::{
    Builder, Bundler, Deployer, PluginContext, PluginRegistry, ProjectHook, TargetHook,
};
use crate::core::project::Project;
use crate::core::target::Target;
use crate::util::fs::{
    find_ancestor_with, lexical_normalize, normalize_path, relative_path, to_slash, walk_glob,
    GlobSpec,
};

static WORKSPACES: LazyLock<Mutex<HashMap<PathBuf, Arc<Workspace>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub struct Workspace {
    root: PathBuf,
    config_file: PathBuf,
    dist_dir: PathBuf,
    meta_dir: PathBuf,
    project_config_filename: String,
    defaults: DefaultsSection,
    plugins: Vec<String>,

    builders: HashMap<String, Arc<dyn Builder>>,
    bundlers: HashMap<String, Arc<dyn Bundler>>,
    deployers: HashMap<String, Arc<dyn Deployer>>,

    project_hooks: Vec<ProjectHook>,
    target_hooks: Vec<TargetHook>,

    projects: Mutex<HashMap<PathBuf, Arc<Project>>>,
}

/// Locate `Keel.toml` in `start` or one of its parents.
pub fn find_workspace_config(start: &Path) -> Result<PathBuf, ConfigError> {
    find_ancestor_with(start, WORKSPACE_CONFIG_NAME)
        .map(|dir| dir.join(WORKSPACE_CONFIG_NAME))
        .ok_or_else(|| ConfigError::WorkspaceNotFound {
            start: start.to_path_buf(),
        })
}

impl Workspace {
    /// Load the workspace enclosing `start`.
    pub fn find(start: &Path) -> Result<Arc<Workspace>, ConfigError> {
        let config_file = find_workspace_config(start)?;
        Self::load(&config_file)
    }

    /// Load the workspace at `config_file` with the built-in plugins,
    /// memoized by the resolved path.
    pub fn load(config_file: &Path) -> Result<Arc<Workspace>, ConfigError> {
        let config_file = normalize_path(config_file);

        if let Some(ws) = WORKSPACES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&config_file)
        {
            return Ok(Arc::clone(ws));
        }

        let ws = Arc::new(Self::load_with(&config_file, &PluginRegistry::builtin())?);

        let mut cache = WORKSPACES.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(config_file).or_insert(ws)))
    }

    /// Load without the process-wide cache, registering plugins from
    /// `registry`.
    pub fn load_with(config_file: &Path, registry: &PluginRegistry) -> Result<Workspace, ConfigError> {
        let config_file = normalize_path(config_file);
        let manifest = WorkspaceManifest::load(&config_file)?;

        let root = config_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::invalid(&config_file, "config file has no parent directory"))?;

        let dist_dir = lexical_normalize(&root.join(
            manifest
                .workspace
                .dist_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIST_DIR)),
        ));
        let meta_dir = lexical_normalize(&root.join(
            manifest
                .workspace
                .meta_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_META_DIR)),
        ));

        let mut ws = Workspace {
            project_config_filename: manifest
                .project
                .config_filename
                .clone()
                .unwrap_or_else(|| DEFAULT_PROJECT_CONFIG_NAME.to_string()),
            plugins: manifest.plugins(),
            defaults: manifest.defaults,
            root,
            config_file,
            dist_dir,
            meta_dir,
            builders: HashMap::new(),
            bundlers: HashMap::new(),
            deployers: HashMap::new(),
            project_hooks: Vec::new(),
            target_hooks: Vec::new(),
            projects: Mutex::new(HashMap::new()),
        };

        for name in ws.plugins.clone() {
            let plugin = registry.get(&name)?;
            tracing::debug!("registering plugin `{}`", plugin.name());
            plugin.register(&mut PluginContext::new(&mut ws))?;
        }

        Ok(ws)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Absolute output directory.
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Absolute metadata directory.
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    pub fn project_config_filename(&self) -> &str {
        &self.project_config_filename
    }

    pub fn defaults(&self) -> &DefaultsSection {
        &self.defaults
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    // Registries

    pub fn add_builder(&mut self, builder: Arc<dyn Builder>) -> Result<(), ConfigError> {
        register(&mut self.builders, "builder", builder.name().to_string(), builder)
    }

    pub fn add_bundler(&mut self, bundler: Arc<dyn Bundler>) -> Result<(), ConfigError> {
        register(&mut self.bundlers, "bundler", bundler.name().to_string(), bundler)
    }

    pub fn add_deployer(&mut self, deployer: Arc<dyn Deployer>) -> Result<(), ConfigError> {
        register(&mut self.deployers, "deployer", deployer.name().to_string(), deployer)
    }

    pub fn builder_named(&self, name: &str) -> Option<Arc<dyn Builder>> {
        self.builders.get(name).cloned()
    }

    pub fn bundler_named(&self, name: &str) -> Option<Arc<dyn Bundler>> {
        self.bundlers.get(name).cloned()
    }

    /// The builder `project` is configured with.
    pub fn get_builder(&self, project: &Project) -> Result<Arc<dyn Builder>, ConfigError> {
        let kind = project.build_kind().unwrap_or_default();
        self.builder_named(kind)
            .ok_or_else(|| ConfigError::MissingBuilder {
                project: project.name.clone(),
                kind: kind.to_string(),
            })
    }

    pub fn get_bundler(&self, target: &Target) -> Result<Arc<dyn Bundler>, ConfigError> {
        self.bundler_named(&target.bundle.kind)
            .ok_or_else(|| ConfigError::MissingBundler {
                target: target.label().to_string(),
                kind: target.bundle.kind.clone(),
            })
    }

    pub fn get_deployer(&self, target: &Target) -> Result<Arc<dyn Deployer>, ConfigError> {
        let kind = target.deploy.as_ref().map(|d| d.kind.clone());
        kind.as_deref()
            .and_then(|name| self.deployers.get(name).cloned())
            .ok_or_else(|| ConfigError::MissingDeployer {
                target: target.label().to_string(),
                kind,
            })
    }

    pub fn builder_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    // Hooks

    pub fn add_project_hook(&mut self, hook: ProjectHook) {
        self.project_hooks.push(hook);
    }

    pub fn add_target_hook(&mut self, hook: TargetHook) {
        self.target_hooks.push(hook);
    }

    pub(crate) fn run_project_hooks(&self, project: &mut Project) {
        for hook in &self.project_hooks {
            hook(project);
        }
    }

    pub(crate) fn run_target_hooks(&self, target: &mut Target) {
        for hook in &self.target_hooks {
            hook(target);
        }
    }

    // Projects

    /// Resolve a project name, directory or config file path to the config
    /// file. Relative inputs are taken relative to the workspace root.
    pub fn project_config_path(&self, name_or_path: &Path) -> Result<PathBuf, ConfigError> {
        let path = if name_or_path.is_absolute() {
            normalize_path(name_or_path)
        } else {
            lexical_normalize(&self.root.join(name_or_path))
        };

        let is_config = path
            .file_name()
            .is_some_and(|name| name == self.project_config_filename.as_str());
        if is_config && path.is_file() {
            return Ok(path);
        }

        let candidate = path.join(&self.project_config_filename);
        if candidate.is_file() {
            return Ok(candidate);
        }

        Err(ConfigError::ProjectNotFound { path: candidate })
    }

    /// Load a project by name (`libs/ui`), directory or config file path.
    pub fn load_project(&self, name_or_path: impl AsRef<Path>) -> Result<Arc<Project>, ConfigError> {
        let config_file = self.project_config_path(name_or_path.as_ref())?;

        if let Some(project) = self.lock_projects().get(&config_file) {
            return Ok(Arc::clone(project));
        }

        let project = Arc::new(Project::load(self, &config_file)?);
        Ok(Arc::clone(
            self.lock_projects().entry(config_file).or_insert(project),
        ))
    }

    /// Load the project and target named by a target label.
    pub fn load_target(&self, label: Label) -> Result<(Arc<Project>, Arc<Target>), ConfigError> {
        let project = self.load_project(label.project())?;
        let name = label.target().unwrap_or_default();
        let target = Arc::clone(project.target(name)?);
        Ok((project, target))
    }

    fn lock_projects(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<Project>>> {
        self.projects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every project config file below the root, sorted. The output
    /// directory and nested workspaces are skipped.
    pub fn find_all_project_configs(&self) -> Result<Vec<PathBuf>> {
        let mut spec = GlobSpec::files([self.project_config_filename.clone()]);
        let dist = relative_path(&self.root, &self.dist_dir);
        if !dist.starts_with("..") && !dist.as_os_str().is_empty() {
            spec.exclude
                .directories
                .push(format!("/{}", to_slash(&dist)));
        }

        let nested_workspace = |dir: &Path| dir.join(WORKSPACE_CONFIG_NAME).is_file();
        let files = walk_glob(&self.root, &spec, nested_workspace)?;

        // Configs only count at the top level of a project directory.
        Ok(files
            .into_iter()
            .filter(|f| f.parent().is_some_and(|p| !p.as_os_str().is_empty()))
            .map(|f| self.root.join(f))
            .collect())
    }

    /// Load every project in the workspace, sorted by name.
    pub fn load_all_projects(&self) -> Result<Vec<Arc<Project>>> {
        let mut projects: Vec<Arc<Project>> = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for config_file in self.find_all_project_configs()? {
            let project = self.load_project(&config_file)?;
            if let Some(first) = seen.insert(project.name.clone(), config_file.clone()) {
                return Err(ConfigError::DuplicateProject {
                    name: project.name.clone(),
                    first,
                    second: config_file,
                }
                .into());
            }
            projects.push(project);
        }

        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    /// Name of the project owning `path`: the nearest ancestor directory
    /// holding a project config, inside the workspace.
    pub fn project_name_for_path(&self, path: &Path) -> Option<String> {
        let path = if path.is_absolute() {
            normalize_path(path)
        } else {
            lexical_normalize(&self.root.join(path))
        };

        let dir = find_ancestor_with(&path, &self.project_config_filename)?;
        if !dir.starts_with(&self.root) || dir == self.root {
            return None;
        }
        Some(to_slash(&relative_path(&self.root, &dir)))
    }
}

fn register<T: ?Sized>(
    registry: &mut HashMap<String, Arc<T>>,
    kind: &'static str,
    name: String,
    item: Arc<T>,
) -> Result<(), ConfigError> {
    if registry.contains_key(&name) {
        return Err(ConfigError::DuplicateRegistration {
            registry: kind,
            name,
        });
    }
    tracing::debug!("registered {} `{}`", kind, name);
    registry.insert(name, item);
    Ok(())
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("dist_dir", &self.dist_dir)
            .field("plugins", &self.plugins)
            .field("builders", &self.builder_names())
            .finish_non_exhaustive()
    }
}
