//! Keel - a build orchestrator for monorepos
//!
//! Projects declare how they are built and what they depend on; keel
//! assembles the steps for the requested labels into a graph, runs each
//! step once, and schedules the resulting file-level actions concurrently.

pub mod build;
pub mod core;
pub mod extract;
pub mod ops;
pub mod plugins;
pub mod util;

/// Test utilities for keel unit tests.
///
/// Only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    dependency::Dependency, label::Label, project::Project, provider::Provider, target::Target,
    workspace::Workspace,
};

pub use util::context::GlobalContext;
