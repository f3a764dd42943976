//! Keel.toml and project config parsing.
//!
//! The workspace config (`Keel.toml`) lives at the workspace root; every
//! project directory holds a project config (`Project.toml` unless the
//! workspace renames it). Both are parsed into the raw schemas below and
//! then turned into [`Workspace`](crate::core::Workspace) and
//! [`Project`](crate::core::Project) values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::dependency::DependencyKind;
use crate::core::errors::ConfigError;
use crate::util::fs::{GlobSpec, PatternSet, DEFAULT_EXCLUDED_DIRECTORIES};

pub const WORKSPACE_CONFIG_NAME: &str = "Keel.toml";
pub const DEFAULT_PROJECT_CONFIG_NAME: &str = "Project.toml";
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const DEFAULT_META_DIR: &str = ".keel";
pub const BUILTIN_PLUGIN: &str = "builtin";

const DEFAULT_SOURCE_FILES: &[&str] = &["**/*"];

/// Parsed `Keel.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkspaceManifest {
    #[serde(default)]
    pub workspace: WorkspaceSection,

    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// `[workspace]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Output tree, relative to the workspace root.
    pub dist_dir: Option<PathBuf>,

    /// Metadata directory, relative to the workspace root.
    pub meta_dir: Option<PathBuf>,

    /// Plugins to register, by name. Defaults to `["builtin"]`.
    pub plugins: Option<Vec<String>>,
}

/// `[project]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectSection {
    pub config_filename: Option<String>,
}

/// `[defaults.build.<type>]` and `[defaults.bundle.<type>]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    #[serde(default)]
    pub build: BTreeMap<String, toml::Table>,

    #[serde(default)]
    pub bundle: BTreeMap<String, toml::Table>,
}

impl WorkspaceManifest {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::invalid(path, e.message()))
    }

    pub fn plugins(&self) -> Vec<String> {
        self.workspace
            .plugins
            .clone()
            .unwrap_or_else(|| vec![BUILTIN_PLUGIN.to_string()])
    }
}

/// A `type` plus free-form configuration.
///
/// Written either as a bare string (`build = "copy"`) or as a table
/// (`build = { type = "command", command = ["tsc"] }`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypedConfig {
    Name(String),
    Table {
        #[serde(rename = "type")]
        kind: String,
        #[serde(flatten)]
        config: toml::Table,
    },
}

impl TypedConfig {
    pub fn kind(&self) -> &str {
        match self {
            TypedConfig::Name(kind) => kind,
            TypedConfig::Table { kind, .. } => kind,
        }
    }

    /// The configuration merged over `defaults[kind]`, shallowly.
    pub fn resolve(&self, defaults: &BTreeMap<String, toml::Table>) -> ResolvedConfig {
        let own = match self {
            TypedConfig::Name(_) => toml::Table::new(),
            TypedConfig::Table { config, .. } => config.clone(),
        };
        ResolvedConfig::merged(self.kind(), defaults, own)
    }
}

/// A type name with its final configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: serde_json::Value,
}

impl ResolvedConfig {
    pub(crate) fn merged(
        kind: &str,
        defaults: &BTreeMap<String, toml::Table>,
        own: toml::Table,
    ) -> ResolvedConfig {
        let mut table = defaults.get(kind).cloned().unwrap_or_default();
        table.extend(own);
        ResolvedConfig {
            kind: kind.to_string(),
            config: toml_to_json(toml::Value::Table(table)),
        }
    }
}

pub(crate) fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::Value::from(i),
        toml::Value::Float(f) => serde_json::Value::from(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(d) => serde_json::Value::String(d.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// `srcs` / `assets`: a list of file globs or an include/exclude table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FileSpec {
    List(Vec<String>),
    Spec {
        #[serde(default)]
        include: Option<PartialPatternSet>,
        #[serde(default)]
        exclude: Option<PartialPatternSet>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialPatternSet {
    pub files: Option<Vec<String>>,
    pub directories: Option<Vec<String>>,
}

/// Expand an optional `srcs`/`assets` entry, filling in `default_files`
/// and the default excluded directories wherever the entry is silent.
pub fn glob_spec(spec: Option<&FileSpec>, default_files: &[&str]) -> GlobSpec {
    let default_files = || default_files.iter().map(|f| f.to_string()).collect::<Vec<_>>();
    let default_dirs = || {
        DEFAULT_EXCLUDED_DIRECTORIES
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
    };

    match spec {
        None => GlobSpec::files(default_files()),
        Some(FileSpec::List(files)) => GlobSpec::files(files.clone()),
        Some(FileSpec::Spec { include, exclude }) => {
            let include = include.clone().unwrap_or_default();
            let exclude = exclude.clone().unwrap_or_default();
            GlobSpec {
                include: PatternSet {
                    files: include.files.unwrap_or_else(default_files),
                    directories: include.directories.unwrap_or_default(),
                },
                exclude: PatternSet {
                    files: exclude.files.unwrap_or_default(),
                    directories: exclude.directories.unwrap_or_else(default_dirs),
                },
            }
        }
    }
}

pub fn source_glob(spec: Option<&FileSpec>) -> GlobSpec {
    glob_spec(spec, DEFAULT_SOURCE_FILES)
}

pub fn asset_glob(spec: Option<&FileSpec>) -> GlobSpec {
    glob_spec(spec, &[])
}

/// Parsed project config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    #[serde(default)]
    pub build: Option<TypedConfig>,

    #[serde(default)]
    pub test: bool,

    #[serde(default)]
    pub srcs: Option<FileSpec>,

    #[serde(default)]
    pub assets: Option<FileSpec>,

    #[serde(default)]
    pub deps: BTreeMap<String, DependencyKind>,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetManifest>,
}

/// `[targets.<name>]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetManifest {
    /// Bundler type.
    pub bundle: String,

    /// Bundle another target of the same project instead of the project.
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub deploy: Option<TypedConfig>,

    /// Everything else is bundler configuration.
    #[serde(flatten)]
    pub config: toml::Table,
}

impl ProjectManifest {
    /// Parse a project config file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<(Self, toml::Table), ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        Self::parse(&content, path)
    }

    /// Parse project config text, returning the typed view and the raw table.
    pub fn parse(content: &str, path: &Path) -> Result<(Self, toml::Table), ConfigError> {
        let raw: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::invalid(path, e.message()))?;
        let manifest: ProjectManifest = toml::Value::Table(raw.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::invalid(path, e.message()))?;
        Ok((manifest, raw))
    }
}

/// The `Keel.toml` written by `keel init`.
pub fn generate_workspace_manifest() -> String {
    format!(
        r#"[workspace]
dist-dir = "{DEFAULT_DIST_DIR}"
meta-dir = "{DEFAULT_META_DIR}"
plugins = ["{BUILTIN_PLUGIN}"]

[project]
config-filename = "{DEFAULT_PROJECT_CONFIG_NAME}"
"#
    )
}
