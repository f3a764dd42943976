//! Plugin contracts.
//!
//! Plugins are linked into the binary and looked up by name from a
//! [`PluginRegistry`]. Registering a plugin hands it a [`PluginContext`]
//! through which it adds builders, bundlers and deployers to the workspace
//! and hooks project/target loading.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::build::context::BuildContext;
use crate::build::file::File;
use crate::core::errors::ConfigError;
use crate::core::project::Project;
use crate::core::provider::Provider;
use crate::core::target::Target;
use crate::core::workspace::Workspace;
use crate::extract::DependencyExtractor;

/// Inputs handed to [`Builder::build`].
pub struct BuildOptions<'a> {
    pub config: &'a Value,
    /// Source files, rooted at the workspace root.
    pub sources: &'a [File],
    pub project: &'a Project,
    /// Providers of the project's dependencies.
    pub deps: &'a [Provider],
}

/// Compiles one project.
///
/// `build` runs once per project; it must register an action on the
/// context for every unit of work and return the providers describing
/// the outputs.
pub trait Builder: Send + Sync {
    fn name(&self) -> &str;

    fn build(&self, cx: &mut BuildContext, opts: BuildOptions<'_>) -> Result<Vec<Provider>>;

    /// Static dependency extraction for projects built by this builder.
    fn extractor(&self) -> Option<&dyn DependencyExtractor> {
        None
    }

    fn validate_config(&self, _config: &Value) -> std::result::Result<(), String> {
        Ok(())
    }
}

pub struct BundleOptions<'a> {
    pub config: &'a Value,
    /// Providers of the bundled project or target.
    pub data: &'a [Provider],
    pub target: &'a Target,
    pub project: &'a Project,
}

/// Bundles a target from the providers of what it wraps.
pub trait Bundler: Send + Sync {
    fn name(&self) -> &str;

    fn bundle(&self, cx: &mut BuildContext, opts: BundleOptions<'_>) -> Result<Vec<Provider>>;

    fn validate_config(&self, _config: &Value) -> std::result::Result<(), String> {
        Ok(())
    }
}

pub struct DeployOptions<'a> {
    pub config: &'a Value,
    pub project: &'a Project,
    pub target: Option<&'a Target>,
}

pub trait Deployer: Send + Sync {
    fn name(&self) -> &str;

    fn deploy(&self, workspace: &Workspace, opts: DeployOptions<'_>) -> Result<()>;
}

pub type ProjectHook = Box<dyn Fn(&mut Project) + Send + Sync>;
pub type TargetHook = Box<dyn Fn(&mut Target) + Send + Sync>;

/// Registration handle passed to [`Plugin::register`].
pub struct PluginContext<'a> {
    workspace: &'a mut Workspace,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(workspace: &'a mut Workspace) -> Self {
        PluginContext { workspace }
    }

    /// Runs `hook` right away against the workspace being loaded.
    pub fn on_workspace_config(
        &mut self,
        hook: impl FnOnce(&mut Workspace) -> std::result::Result<(), ConfigError>,
    ) -> std::result::Result<(), ConfigError> {
        hook(self.workspace)
    }

    /// Runs `hook` on every project right after it is parsed.
    pub fn on_project_config(&mut self, hook: impl Fn(&mut Project) + Send + Sync + 'static) {
        self.workspace.add_project_hook(Box::new(hook));
    }

    /// Runs `hook` on every target right after it is parsed.
    pub fn on_target_config(&mut self, hook: impl Fn(&mut Target) + Send + Sync + 'static) {
        self.workspace.add_target_hook(Box::new(hook));
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn register(&self, cx: &mut PluginContext<'_>) -> std::result::Result<(), ConfigError>;
}

/// The plugins available to `[workspace] plugins`.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the plugins shipped with keel.
    pub fn builtin() -> Self {
        Self::new().with(Arc::new(crate::plugins::BuiltinPlugin))
    }

    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn get(&self, name: &str) -> std::result::Result<Arc<dyn Plugin>, ConfigError> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPlugin {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = PluginRegistry::builtin();
        assert_eq!(registry.names(), ["builtin"]);
        assert!(registry.get("builtin").is_ok());

        match registry.get("esbuild") {
            Err(ConfigError::UnknownPlugin { name, available }) => {
                assert_eq!(name, "esbuild");
                assert_eq!(available, ["builtin"]);
            }
            other => panic!("unexpected result: {:?}", other.map(|p| p.name().to_string())),
        }
    }
}
