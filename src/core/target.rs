//! Targets - named entry points that bundle a project.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::core::errors::ConfigError;
use crate::core::label::{Label, LabelError};
use crate::core::manifest::{ResolvedConfig, TargetManifest};
use crate::util::InternedString;

/// Bundler selection for a target.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleConfig {
    /// Bundler type.
    pub kind: String,

    /// Another target of the same project to bundle instead of the project.
    pub target: Option<String>,

    pub config: Value,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub name: InternedString,

    /// Name of the owning project.
    pub project: InternedString,

    pub bundle: BundleConfig,

    pub deploy: Option<ResolvedConfig>,

    /// The target named after the project's directory.
    pub is_default: bool,
}

impl Target {
    pub(crate) fn from_manifest(
        name: &str,
        project: &str,
        manifest: &TargetManifest,
        bundle_defaults: &BTreeMap<String, toml::Table>,
        config_file: &Path,
    ) -> Result<Self, ConfigError> {
        let project_label = Label::new(project, None);
        // Target names follow the bare-target grammar so `project:name` parses.
        let label = Label::parse_in(name, Some(project_label))
            .map_err(|_| ConfigError::invalid(config_file, format!("invalid target name `{}`", name)))?;
        if label.project() != project {
            return Err(ConfigError::invalid(
                config_file,
                format!("invalid target name `{}`", name),
            ));
        }

        let bundle = ResolvedConfig::merged(&manifest.bundle, bundle_defaults, manifest.config.clone());
        let deploy = manifest
            .deploy
            .as_ref()
            .map(|deploy| deploy.resolve(&BTreeMap::new()));

        let basename = project.rsplit('/').next().unwrap_or(project);

        Ok(Target {
            name: InternedString::new(name),
            project: InternedString::new(project),
            bundle: BundleConfig {
                kind: bundle.kind,
                target: manifest.target.clone(),
                config: bundle.config,
            },
            deploy,
            is_default: basename == name,
        })
    }

    pub fn label(&self) -> Label {
        Label::new(&self.project, Some(&self.name))
    }

    pub fn project_label(&self) -> Label {
        Label::new(&self.project, None)
    }

    /// What this target's step depends on: the target it bundles, or its
    /// own project.
    pub fn bundled_label(&self) -> Result<Label, LabelError> {
        match self.bundle.target {
            Some(ref other) => Label::parse_in(other, Some(self.project_label())),
            None => Ok(self.project_label()),
        }
    }

    /// `project` for the default target, `project:target` otherwise.
    pub fn display_name(&self) -> String {
        if self.is_default {
            self.project.to_string()
        } else {
            format!("{}:{}", self.project, self.name)
        }
    }
}
