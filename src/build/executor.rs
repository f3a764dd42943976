//! Build graph executor.
//!
//! Steps start as soon as every step they depend on has finished. Each
//! node keeps a count of unfinished dependencies; when a step completes
//! the dispatcher decrements the counts of its dependents and starts the
//! ones that reach zero. Only the dispatcher touches the graph, the
//! provider map and the action graph; steps run on the blocking pool and
//! hand back their providers and actions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;

use crate::build::action::{Action, ActionGraph};
use crate::build::build_graph::{dependencies_of, BuildGraph};
use crate::build::context::BuildContext;
use crate::build::events::{BuildEvent, EventLog};
use crate::core::label::Label;
use crate::core::provider::{merge_unique, Provider};
use crate::core::workspace::Workspace;

/// A step that returned an error.
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub label: Label,
    pub message: String,
}

/// Everything the build graph produced.
#[derive(Debug, Default)]
pub struct ExecutedGraph {
    pub providers: HashMap<Label, Vec<Provider>>,
    pub actions: ActionGraph,
    pub failures: Vec<StepFailure>,
    /// Steps that never ran because a dependency failed, sorted.
    pub skipped: Vec<Label>,
}

impl ExecutedGraph {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn providers_of(&self, label: &Label) -> &[Provider] {
        self.providers.get(label).map(Vec::as_slice).unwrap_or_default()
    }
}

type StepResult = (Label, Result<Vec<Provider>>, Vec<Action>);

/// Run every step of `graph` once, dependencies first.
pub async fn execute(workspace: Arc<Workspace>, graph: &BuildGraph, events: &EventLog) -> ExecutedGraph {
    let mut out = ExecutedGraph::default();
    let mut remaining: HashMap<Label, usize> = graph
        .keys()
        .map(|label| (*label, graph.edges_from(label).len()))
        .collect();
    let mut skipped: HashSet<Label> = HashSet::new();
    let mut tasks: JoinSet<StepResult> = JoinSet::new();

    let mut ready: Vec<Label> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(label, _)| *label)
        .collect();
    ready.sort();
    for label in ready {
        spawn_step(&mut tasks, &workspace, graph, &out.providers, label);
    }

    while let Some(joined) = tasks.join_next().await {
        let (label, result, actions) = match joined {
            Ok(done) => done,
            Err(err) => {
                tracing::error!("build step task failed: {}", err);
                continue;
            }
        };

        match result {
            Ok(providers) => {
                tracing::debug!("{}: {} providers, {} actions", label, providers.len(), actions.len());
                for action in actions {
                    out.actions.add_action(action);
                }
                out.providers.insert(label, providers);
                events.push(BuildEvent::StepFinished {
                    label: label.to_string(),
                });

                for edge in graph.edges_to(&label) {
                    let dependent = *edge.from;
                    if skipped.contains(&dependent) {
                        continue;
                    }
                    let Some(count) = remaining.get_mut(&dependent) else {
                        continue;
                    };
                    *count -= 1;
                    if *count == 0 {
                        spawn_step(&mut tasks, &workspace, graph, &out.providers, dependent);
                    }
                }
            }
            Err(err) => {
                let message = format!("{:#}", err);
                tracing::error!("{}", message);
                events.push(BuildEvent::StepFailed {
                    label: label.to_string(),
                    message: message.clone(),
                });
                out.failures.push(StepFailure { label, message });

                for dependent in transitive_dependents(graph, label) {
                    if skipped.insert(dependent) {
                        tracing::info!("skipping {}: {} failed", dependent, label);
                        events.push(BuildEvent::StepSkipped {
                            label: dependent.to_string(),
                        });
                    }
                }
            }
        }
    }

    let failed: HashSet<Label> = out.failures.iter().map(|f| f.label).collect();
    for label in graph.keys() {
        if !out.providers.contains_key(label) && !failed.contains(label) && skipped.insert(*label) {
            events.push(BuildEvent::StepSkipped {
                label: label.to_string(),
            });
        }
    }

    out.skipped = skipped.into_iter().collect();
    out.skipped.sort();
    out
}

fn spawn_step(
    tasks: &mut JoinSet<StepResult>,
    workspace: &Arc<Workspace>,
    graph: &BuildGraph,
    providers: &HashMap<Label, Vec<Provider>>,
    label: Label,
) {
    let Some(step) = graph.get(&label).cloned() else {
        return;
    };
    let upstream = merge_unique(
        dependencies_of(graph, &label)
            .iter()
            .map(|dep| providers.get(dep).map(Vec::as_slice).unwrap_or_default()),
    );
    let workspace = Arc::clone(workspace);

    tracing::debug!("starting {}", step);
    tasks.spawn_blocking(move || {
        let mut cx = BuildContext::new(label, workspace);
        let result = catch_unwind(AssertUnwindSafe(|| step.execute(&mut cx, &upstream)))
            .unwrap_or_else(|_| Err(anyhow!("{} panicked", step.mnemonic)));
        (label, result, cx.into_actions())
    });
}

/// Every step depending on `label`, directly or not.
fn transitive_dependents(graph: &BuildGraph, label: Label) -> Vec<Label> {
    let mut seen: HashSet<Label> = HashSet::new();
    let mut queue: VecDeque<Label> = VecDeque::from([label]);
    let mut out = Vec::new();

    while let Some(current) = queue.pop_front() {
        for edge in graph.edges_to(&current) {
            let dependent = *edge.from;
            if seen.insert(dependent) {
                out.push(dependent);
                queue.push_back(dependent);
            }
        }
    }

    out.sort();
    out
}
