//! Implementation of `keel graph`.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::build::build_graph::assemble;
use crate::build::events::EventLog;
use crate::build::execution::ExecutionGraph;
use crate::build::executor::execute;
use crate::core::label::Label;
use crate::core::provider::DefaultInfo;
use crate::core::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphKind {
    /// Steps and their dependencies.
    #[default]
    Build,
    /// The actions needed for the labels' outputs. Runs the build steps,
    /// but no actions.
    Actions,
}

/// Graphviz dot of the graph of `kind` for `labels`.
pub async fn render_graph(workspace: Arc<Workspace>, labels: &[Label], kind: GraphKind) -> Result<String> {
    let graph = assemble(&workspace, labels)?;
    if kind == GraphKind::Build {
        return Ok(graph.to_dot());
    }

    let executed = execute(Arc::clone(&workspace), &graph, &EventLog::new()).await;
    if let Some(failure) = executed.failures.first() {
        bail!("{} failed: {}", failure.label, failure.message);
    }

    let outputs: Vec<PathBuf> = labels
        .iter()
        .flat_map(|label| DefaultInfo::files(executed.providers_of(label)))
        .map(|file| file.absolute_path())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    Ok(ExecutionGraph::reduce(&executed.actions, &outputs).to_dot())
}
