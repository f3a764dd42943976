//! Build graph assembly.
//!
//! The build graph has one step per requested project or target plus
//! everything they depend on. Edges point from a step to the steps it
//! depends on.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::errors::ConfigError;
use crate::core::graph::Graph;
use crate::core::label::{Label, LabelError};
use crate::core::project::Project;
use crate::core::target::Target;
use crate::core::workspace::Workspace;

pub type BuildGraph = Graph<Label, BuildStep>;

#[derive(Debug, Error)]
pub enum BuildGraphError {
    #[error("dependency cycle between {}", .labels.join(", "))]
    Cycle { labels: Vec<String> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Label(#[from] LabelError),
}

#[derive(Debug, Clone)]
pub enum StepKind {
    /// Compiles a project and copies its assets.
    Project(Arc<Project>),
    /// Bundles a target.
    Target {
        project: Arc<Project>,
        target: Arc<Target>,
    },
}

/// A node of the build graph.
#[derive(Debug, Clone)]
pub struct BuildStep {
    pub label: Label,
    pub kind: StepKind,
    pub mnemonic: String,
}

impl BuildStep {
    /// Load the project or target behind `label`. A declared builder or
    /// bundler that is not registered fails here, before anything runs.
    fn load(workspace: &Workspace, label: Label) -> Result<Self, ConfigError> {
        if label.is_target() {
            let (project, target) = workspace.load_target(label)?;
            workspace.get_bundler(&target)?;
            Ok(BuildStep {
                label,
                mnemonic: format!("Bundle {}", label),
                kind: StepKind::Target { project, target },
            })
        } else {
            let project = workspace.load_project(label.project())?;
            if project.build.is_some() {
                workspace.get_builder(&project)?;
            }
            Ok(BuildStep {
                label,
                mnemonic: format!("Build {}", label),
                kind: StepKind::Project(project),
            })
        }
    }

    /// Labels of the steps this one waits for.
    pub fn dependencies(&self) -> Result<Vec<Label>, LabelError> {
        match &self.kind {
            StepKind::Project(project) => Ok(project.dependencies.labels()),
            StepKind::Target { target, .. } => Ok(vec![target.bundled_label()?]),
        }
    }

    pub fn project(&self) -> &Arc<Project> {
        match &self.kind {
            StepKind::Project(project) | StepKind::Target { project, .. } => project,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic)
    }
}

/// Expand `labels` into the build graph of everything they need.
///
/// Fails on the first configuration error, and with
/// [`BuildGraphError::Cycle`] when the result is not acyclic.
pub fn assemble(workspace: &Workspace, labels: &[Label]) -> Result<BuildGraph, BuildGraphError> {
    let mut graph = BuildGraph::new();
    let mut visited: HashSet<Label> = HashSet::new();
    let mut queue: VecDeque<Label> = labels.iter().copied().collect();
    let mut edges: Vec<(Label, Label)> = Vec::new();

    while let Some(label) = queue.pop_front() {
        if !visited.insert(label) {
            continue;
        }

        let step = BuildStep::load(workspace, label)?;
        let dependencies = step.dependencies()?;
        tracing::debug!("{}: depends on {} steps", label, dependencies.len());

        for dependency in dependencies {
            edges.push((label, dependency));
            if !visited.contains(&dependency) {
                queue.push_back(dependency);
            }
        }
        graph.add(label, step);
    }

    for (from, to) in &edges {
        graph.add_edge(from, to, ());
    }

    let cycles = graph.find_cycles();
    if let Some(cycle) = cycles.first() {
        let mut labels: Vec<String> = cycle.iter().map(|label| label.to_string()).collect();
        labels.sort();
        return Err(BuildGraphError::Cycle { labels });
    }

    Ok(graph)
}

/// Labels `label` depends on, sorted.
pub fn dependencies_of(graph: &BuildGraph, label: &Label) -> Vec<Label> {
    let mut labels: Vec<Label> = graph.edges_from(label).iter().map(|e| *e.to).collect();
    labels.sort();
    labels
}

/// Labels depending on `label`, sorted.
pub fn dependents_of(graph: &BuildGraph, label: &Label) -> Vec<Label> {
    let mut labels: Vec<Label> = graph.edges_to(label).iter().map(|e| *e.from).collect();
    labels.sort();
    labels
}
