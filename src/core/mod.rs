//! Core data structures for keel.
//!
//! This module contains the foundational types used throughout keel:
//! - Interned labels naming projects and targets
//! - The keyed graph shared by every build stage
//! - Workspace, project and target configuration
//! - Providers, dependency records and plugin contracts

pub mod dependency;
pub mod errors;
pub mod graph;
pub mod label;
pub mod manifest;
pub mod plugin;
pub mod project;
pub mod provider;
pub mod target;
pub mod workspace;

pub use dependency::{Dependencies, Dependency, DependencyKind};
pub use errors::ConfigError;
pub use graph::Graph;
pub use label::{Label, LabelError};
pub use plugin::{Builder, Bundler, Deployer, Plugin, PluginContext, PluginRegistry};
pub use project::Project;
pub use provider::{CustomProvider, DefaultInfo, ExternalModuleInfo, Provider, ProviderKind};
pub use target::Target;
pub use workspace::Workspace;
