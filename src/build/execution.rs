//! Reduction of the action graph to the execution graph.
//!
//! Starting from the files that are actually needed, walk back through the
//! actions producing them, and through the producers of those actions'
//! inputs, collecting only what contributes to a needed file. The result is
//! a graph over actions: an edge `a -> b` means `a` reads something `b`
//! writes.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use crate::build::action::{Action, ActionGraph, ActionId};
use crate::core::graph::Graph;

#[derive(Debug, Default)]
pub struct ExecutionGraph {
    graph: Graph<ActionId, Arc<Action>>,
}

impl ExecutionGraph {
    /// Collect the actions needed to produce `needed` (absolute paths).
    /// Paths no action produces are ignored.
    pub fn reduce(actions: &ActionGraph, needed: &[PathBuf]) -> Self {
        let mut graph: Graph<ActionId, Arc<Action>> = Graph::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut stack: Vec<PathBuf> = needed.to_vec();

        while let Some(path) = stack.pop() {
            if !seen.insert(path.clone()) {
                continue;
            }
            let Some(id) = actions.producer_of(&path) else {
                continue;
            };
            if graph.contains(&id) {
                continue;
            }

            let action = Arc::clone(actions.action(id));
            stack.extend(action.input_paths());
            graph.add(id, action);
        }

        let ids: Vec<ActionId> = graph.keys().copied().collect();
        for id in ids {
            let inputs = actions.action(id).input_paths();
            for input in inputs {
                match actions.producer_of(&input) {
                    Some(producer) if producer != id => {
                        graph.add_edge(&id, &producer, ());
                    }
                    _ => {}
                }
            }
        }

        tracing::debug!(
            "execution graph: {} of {} actions for {} files",
            graph.len(),
            actions.len(),
            needed.len()
        );

        ExecutionGraph { graph }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn contains(&self, id: ActionId) -> bool {
        self.graph.contains(&id)
    }

    pub fn action(&self, id: ActionId) -> Option<&Arc<Action>> {
        self.graph.get(&id)
    }

    /// Every action id, ascending.
    pub fn ids(&self) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self.graph.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Actions producing the inputs of `id`.
    pub fn dependencies(&self, id: ActionId) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self.graph.edges_from(&id).iter().map(|e| *e.to).collect();
        ids.sort();
        ids
    }

    /// Actions reading the outputs of `id`.
    pub fn dependents(&self, id: ActionId) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self.graph.edges_to(&id).iter().map(|e| *e.from).collect();
        ids.sort();
        ids
    }

    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for id in self.ids() {
            let Some(action) = self.action(id) else {
                continue;
            };
            let _ = writeln!(out, "    \"{}\" [label={:?}];", id, action.mnemonic);
            for dep in self.dependencies(id) {
                let _ = writeln!(out, "    \"{}\" -> \"{}\";", id, dep);
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::action::tests::action;

    fn abs(path: &str) -> PathBuf {
        PathBuf::from("/ws").join(path)
    }

    #[test]
    fn test_reduce_keeps_only_needed_actions() {
        let mut actions = ActionGraph::new();
        let lib = actions.add_action(action("Lib", &["lib/a.ts"], &["dist/lib/a.js"]));
        let app = actions.add_action(action(
            "App",
            &["app/main.ts", "dist/lib/a.js"],
            &["dist/app/main.js"],
        ));
        let test = actions.add_action(action(
            "Test",
            &["test/a.test.ts", "dist/lib/a.js"],
            &["dist/test/a.test.js"],
        ));

        let graph = ExecutionGraph::reduce(&actions, &[abs("dist/app/main.js")]);
        assert_eq!(graph.ids(), [lib, app]);
        assert!(!graph.contains(test));
        assert_eq!(graph.dependencies(app), [lib]);
        assert_eq!(graph.dependents(lib), [app]);
    }

    #[test]
    fn test_reduce_follows_chains() {
        let mut actions = ActionGraph::new();
        let a = actions.add_action(action("A", &["src/x"], &["gen/x"]));
        let b = actions.add_action(action("B", &["gen/x"], &["gen/y"]));
        let c = actions.add_action(action("C", &["gen/y"], &["out/z"]));

        let graph = ExecutionGraph::reduce(&actions, &[abs("out/z")]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependencies(c), [b]);
        assert_eq!(graph.dependencies(b), [a]);
        assert!(graph.dependencies(a).is_empty());
    }

    #[test]
    fn test_unproduced_files_are_ignored() {
        let mut actions = ActionGraph::new();
        actions.add_action(action("A", &["src/x"], &["gen/x"]));

        let graph = ExecutionGraph::reduce(&actions, &[abs("src/x"), abs("missing")]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_multi_output_action_is_one_node() {
        let mut actions = ActionGraph::new();
        let gen = actions.add_action(action("Gen", &["schema"], &["gen/a", "gen/b"]));
        let use_a = actions.add_action(action("UseA", &["gen/a"], &["out/a"]));
        let use_b = actions.add_action(action("UseB", &["gen/b"], &["out/b"]));

        let graph = ExecutionGraph::reduce(&actions, &[abs("out/a"), abs("out/b")]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.dependents(gen), [use_a, use_b]);
        assert!(graph.to_dot().contains("[label=\"Gen\"]"));
    }
}
