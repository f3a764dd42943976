//! Configuration error types and diagnostics.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::label::LabelError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Anything wrong with the workspace or project configuration.
///
/// These are fatal: they surface straight to the caller and are never
/// retried.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ConfigError {
    #[error("could not find `Keel.toml` in `{}` or any parent directory", .start.display())]
    #[diagnostic(code(keel::config::no_workspace), help("run `keel init` to create a workspace"))]
    WorkspaceNotFound { start: PathBuf },

    #[error("could not find a project config file at {}", .path.display())]
    #[diagnostic(code(keel::config::no_project))]
    ProjectNotFound { path: PathBuf },

    #[error("project `{project}` has no target named `{target}`")]
    #[diagnostic(code(keel::config::no_target), help("run `keel list targets` to see every target"))]
    TargetNotFound { project: String, target: String },

    #[error("failed to read {}", .path.display())]
    #[diagnostic(code(keel::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {message}", .path.display())]
    #[diagnostic(code(keel::config::invalid))]
    Invalid { path: PathBuf, message: String },

    #[error("project `{project}` does not have a valid builder configured (no builder named `{kind}`)")]
    #[diagnostic(code(keel::config::missing_builder))]
    MissingBuilder { project: String, kind: String },

    #[error("target `{target}` does not have a valid bundler configured (no bundler named `{kind}`)")]
    #[diagnostic(code(keel::config::missing_bundler))]
    MissingBundler { target: String, kind: String },

    #[error("target `{target}` does not have a valid deployer configured")]
    #[diagnostic(code(keel::config::missing_deployer))]
    MissingDeployer { target: String, kind: Option<String> },

    #[error("a {registry} named `{name}` is already registered")]
    #[diagnostic(code(keel::plugin::duplicate))]
    DuplicateRegistration { registry: &'static str, name: String },

    #[error("unknown plugin `{name}`")]
    #[diagnostic(code(keel::plugin::unknown))]
    UnknownPlugin { name: String, available: Vec<String> },

    #[error("project names must be unique, `{name}` is defined by both {} and {}", .first.display(), .second.display())]
    #[diagnostic(code(keel::config::duplicate_project))]
    DuplicateProject {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Label(#[from] LabelError),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigError::WorkspaceNotFound { start } => {
                Diagnostic::error("could not find a keel workspace")
                    .with_context(format!("searched `{}` and its parents for `Keel.toml`", start.display()))
                    .with_suggestion(suggestions::NO_WORKSPACE)
            }

            ConfigError::ProjectNotFound { path } => Diagnostic::error(self.to_string())
                .with_location(path)
                .with_suggestion(suggestions::LIST_PROJECTS),

            ConfigError::TargetNotFound { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::LIST_TARGETS)
            }

            ConfigError::Invalid { path, message } => {
                Diagnostic::error(format!("invalid config file: {}", message)).with_location(path)
            }

            ConfigError::MissingBuilder { project, kind } => {
                Diagnostic::error(format!("project `{}` cannot be built", project))
                    .with_context(format!("no builder named `{}` is registered", kind))
                    .with_suggestion("Check the `build` key of the project config")
                    .with_suggestion("Add the plugin providing it to `[workspace] plugins` in Keel.toml")
            }

            ConfigError::MissingBundler { target, kind } => {
                Diagnostic::error(format!("target `{}` cannot be bundled", target))
                    .with_context(format!("no bundler named `{}` is registered", kind))
                    .with_suggestion("Check the `bundle` key of the target config")
            }

            ConfigError::UnknownPlugin { name, available } => {
                let mut diag = Diagnostic::error(format!("unknown plugin `{}`", name));
                if !available.is_empty() {
                    diag = diag.with_context(format!("available plugins: {}", available.join(", ")));
                }
                diag
            }

            ConfigError::DuplicateProject { first, second, .. } => {
                Diagnostic::error(self.to_string())
                    .with_context(format!("first defined at {}", first.display()))
                    .with_location(second)
            }

            _ => Diagnostic::error(self.to_string()),
        }
    }
}
