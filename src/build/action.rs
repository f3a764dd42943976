//! Actions and the action graph.
//!
//! An [`Action`] is one concrete unit of work: it reads its input files and
//! writes its output files. The [`ActionGraph`] is keyed by absolute file
//! path; an edge `input -> output` carries the id of the action turning one
//! into the other. Actions registered by different steps connect wherever
//! they share a path.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::build::file::File;
use crate::core::graph::Graph;
use crate::core::label::Label;

pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// The body of an action, called with the action's config.
pub type ActionFn = Arc<dyn Fn(Value) -> ActionFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Action {
    /// Step that registered the action.
    pub label: Label,
    pub mnemonic: String,
    pub inputs: Vec<File>,
    pub outputs: Vec<File>,
    pub config: Value,
    run: ActionFn,
}

impl Action {
    pub fn new(
        label: Label,
        mnemonic: impl Into<String>,
        inputs: Vec<File>,
        outputs: Vec<File>,
        config: Value,
        run: ActionFn,
    ) -> Self {
        Action {
            label,
            mnemonic: mnemonic.into(),
            inputs,
            outputs,
            config,
            run,
        }
    }

    /// Start the action. The returned future does all the work.
    pub fn execute(&self) -> ActionFuture {
        (self.run)(self.config.clone())
    }

    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.inputs.iter().map(File::absolute_path).collect()
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(File::absolute_path).collect()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("label", &self.label)
            .field("mnemonic", &self.mnemonic)
            .field("inputs", &self.input_paths())
            .field("outputs", &self.output_paths())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct ActionGraph {
    graph: Graph<PathBuf, File, ActionId>,
    actions: Vec<Arc<Action>>,
    producers: HashMap<PathBuf, ActionId>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `action` into the graph and return its id.
    ///
    /// Every output has one producer. When a later action declares an
    /// output that already has one, the later action wins and the earlier
    /// action's edges into that file are dropped.
    pub fn add_action(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.actions.len());

        for file in action.inputs.iter().chain(action.outputs.iter()) {
            self.graph.add(file.absolute_path(), file.clone());
        }

        let inputs = action.input_paths();
        for output in action.output_paths() {
            if let Some(previous) = self.producers.insert(output.clone(), id).filter(|p| *p != id) {
                tracing::warn!(
                    "`{}` is declared as an output of both `{}` and `{}`; keeping `{}`",
                    output.display(),
                    self.actions[previous.0].mnemonic,
                    action.mnemonic,
                    action.mnemonic
                );
                let stale: Vec<PathBuf> = self
                    .graph
                    .edges_to(&output)
                    .iter()
                    .filter(|edge| *edge.data == previous)
                    .map(|edge| edge.from.clone())
                    .collect();
                for from in stale {
                    self.graph.remove_edge(&from, &output);
                }
            }

            for input in &inputs {
                self.graph.add_edge(input, &output, id);
            }
        }

        tracing::debug!(
            "action {} `{}`: {} inputs, {} outputs",
            id,
            action.mnemonic,
            action.inputs.len(),
            action.outputs.len()
        );

        self.actions.push(Arc::new(action));
        id
    }

    pub fn action(&self, id: ActionId) -> &Arc<Action> {
        &self.actions[id.0]
    }

    pub fn actions(&self) -> &[Arc<Action>] {
        &self.actions
    }

    /// The action producing `path`, if any.
    pub fn producer_of(&self, path: &Path) -> Option<ActionId> {
        self.producers.get(path).copied()
    }

    pub fn graph(&self) -> &Graph<PathBuf, File, ActionId> {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Graphviz rendering; edges are labelled with the action mnemonic.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for key in self.graph.keys() {
            let _ = writeln!(out, "    {:?};", key.display().to_string());
            for edge in self.graph.edges_from(key) {
                let _ = writeln!(
                    out,
                    "    {:?} -> {:?} [label={:?}];",
                    edge.from.display().to_string(),
                    edge.to.display().to_string(),
                    self.actions[edge.data.0].mnemonic
                );
            }
        }
        out.push_str("}\n");
        out
    }
}
