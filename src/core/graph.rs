//! Keyed directed graph.
//!
//! The same structure backs the build graph (labels -> build steps), the
//! action graph (file paths -> files, edges carry actions) and the execution
//! graph (actions -> actions). Nodes are addressed by key; edges never
//! create nodes implicitly. The graph does not check for cycles itself,
//! callers use [`Graph::find_cycles`] where acyclicity matters.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::hash::Hash;

use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// A node: its key plus the data stored under it.
#[derive(Debug, Clone)]
pub struct Node<K, N> {
    pub key: K,
    pub data: N,
}

/// A borrowed view of one edge.
#[derive(Debug)]
pub struct Edge<'g, K, E> {
    pub from: &'g K,
    pub to: &'g K,
    pub data: &'g E,
}

impl<K, E> Clone for Edge<'_, K, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, E> Copy for Edge<'_, K, E> {}

pub struct Graph<K, N, E = ()> {
    inner: StableDiGraph<Node<K, N>, E>,
    index: HashMap<K, NodeIndex>,
    /// Live nodes in insertion order; `StableDiGraph` reuses vacated slots.
    order: Vec<NodeIndex>,
}

impl<K, N, E> Graph<K, N, E>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert a node. If `key` is already present the existing node is kept
    /// and `data` is dropped.
    pub fn add(&mut self, key: K, data: N) -> &Node<K, N> {
        let ix = match self.index.get(&key) {
            Some(&ix) => ix,
            None => {
                let ix = self.inner.add_node(Node {
                    key: key.clone(),
                    data,
                });
                self.index.insert(key, ix);
                self.order.push(ix);
                ix
            }
        };
        &self.inner[ix]
    }

    /// Connect two existing nodes. Returns `None`, recording nothing, when
    /// either endpoint is missing. An existing edge between the same pair has
    /// its data replaced.
    pub fn add_edge(&mut self, from: &K, to: &K, data: E) -> Option<Edge<'_, K, E>> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        let id = self.inner.update_edge(a, b, data);
        self.edge_view(id)
    }

    /// Outgoing edges of `key`; empty when the node does not exist.
    pub fn edges_from(&self, key: &K) -> Vec<Edge<'_, K, E>> {
        self.edges_directed(key, Direction::Outgoing)
    }

    /// Incoming edges of `key`; empty when the node does not exist.
    pub fn edges_to(&self, key: &K) -> Vec<Edge<'_, K, E>> {
        self.edges_directed(key, Direction::Incoming)
    }

    fn edges_directed(&self, key: &K, direction: Direction) -> Vec<Edge<'_, K, E>> {
        let Some(&ix) = self.index.get(key) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(ix, direction)
            .filter_map(|edge| self.edge_view(edge.id()))
            .collect()
    }

    fn edge_view(&self, id: EdgeIndex) -> Option<Edge<'_, K, E>> {
        let (a, b) = self.inner.edge_endpoints(id)?;
        Some(Edge {
            from: &self.inner[a].key,
            to: &self.inner[b].key,
            data: &self.inner[id],
        })
    }

    /// Remove a node together with every edge touching it.
    pub fn remove(&mut self, key: &K) -> Option<N> {
        let ix = self.index.remove(key)?;
        self.order.retain(|&live| live != ix);
        self.inner.remove_node(ix).map(|node| node.data)
    }

    pub fn remove_edge(&mut self, from: &K, to: &K) -> Option<E> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        let id = self.inner.find_edge(a, b)?;
        self.inner.remove_edge(id)
    }

    pub fn get(&self, key: &K) -> Option<&N> {
        self.index.get(key).map(|&ix| &self.inner[ix].data)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut N> {
        let ix = *self.index.get(key)?;
        Some(&mut self.inner[ix].data)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get_edge(&self, from: &K, to: &K) -> Option<&E> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        self.inner.find_edge(a, b).map(|id| &self.inner[id])
    }

    pub fn has_edge(&self, from: &K, to: &K) -> bool {
        self.get_edge(from, to).is_some()
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<K, N>> + '_ {
        self.order.iter().map(move |&ix| &self.inner[ix])
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.nodes().map(|node| &node.key)
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Strongly connected components that form a cycle: components with
    /// more than one node, plus nodes with a self edge.
    pub fn find_cycles(&self) -> Vec<Vec<&K>> {
        tarjan_scc(&self.inner)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.inner.find_edge(*single, *single).is_some(),
                _ => true,
            })
            .map(|component| {
                component
                    .into_iter()
                    .map(|ix| &self.inner[ix].key)
                    .collect()
            })
            .collect()
    }
}

impl<K, N, E> Graph<K, N, E>
where
    K: Eq + Hash + Clone + fmt::Display,
{
    /// Render as Graphviz dot, one statement per node and edge.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for node in self.nodes() {
            let _ = writeln!(out, "    {:?};", node.key.to_string());
        }
        for ix in self.inner.edge_indices() {
            if let Some(edge) = self.edge_view(ix) {
                let _ = writeln!(
                    out,
                    "    {:?} -> {:?};",
                    edge.from.to_string(),
                    edge.to.to_string()
                );
            }
        }
        out.push_str("}\n");
        out
    }
}

impl<K, N, E> Default for Graph<K, N, E>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, N, E> fmt::Debug for Graph<K, N, E>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.index.keys().collect::<Vec<_>>())
            .field("edges", &self.inner.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Graph<&'static str, u32, &'static str> {
        let mut graph = Graph::new();
        graph.add("a", 1);
        graph.add("b", 2);
        graph.add("c", 3);
        graph
    }

    #[test]
    fn test_add_keeps_first_writer() {
        let mut graph = abc();
        assert_eq!(graph.add("a", 100).data, 1);
        assert_eq!(graph.get(&"a"), Some(&1));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_add_edge_requires_both_endpoints() {
        let mut graph = abc();
        assert!(graph.add_edge(&"a", &"missing", "x").is_none());
        assert!(graph.add_edge(&"missing", &"a", "x").is_none());
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains(&"missing"));

        let edge = graph.add_edge(&"a", &"b", "ab").unwrap();
        assert_eq!((*edge.from, *edge.to, *edge.data), ("a", "b", "ab"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_add_edge_replaces_existing_data() {
        let mut graph = abc();
        graph.add_edge(&"a", &"b", "first");
        graph.add_edge(&"a", &"b", "second");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.get_edge(&"a", &"b"), Some(&"second"));
    }

    #[test]
    fn test_edge_queries_in_both_directions() {
        let mut graph = abc();
        graph.add_edge(&"a", &"b", "ab");
        graph.add_edge(&"a", &"c", "ac");
        graph.add_edge(&"b", &"c", "bc");

        let mut out: Vec<&str> = graph.edges_from(&"a").iter().map(|e| *e.to).collect();
        out.sort();
        assert_eq!(out, ["b", "c"]);

        let mut incoming: Vec<&str> = graph.edges_to(&"c").iter().map(|e| *e.from).collect();
        incoming.sort();
        assert_eq!(incoming, ["a", "b"]);

        assert!(graph.edges_from(&"zzz").is_empty());
    }

    #[test]
    fn test_remove_drops_incident_edges() {
        let mut graph = abc();
        graph.add_edge(&"a", &"b", "ab");
        graph.add_edge(&"b", &"c", "bc");

        assert_eq!(graph.remove(&"b"), Some(2));
        assert!(!graph.contains(&"b"));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edges_from(&"a").is_empty());
        assert!(graph.edges_to(&"c").is_empty());
        assert_eq!(graph.remove(&"b"), None);
    }

    #[test]
    fn test_nodes_keep_insertion_order_across_removal() {
        let mut graph = abc();
        graph.remove(&"a");
        graph.add("d", 4);
        graph.add("e", 5);

        assert_eq!(graph.keys().copied().collect::<Vec<_>>(), ["b", "c", "d", "e"]);
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.get(&"d"), Some(&4));
    }

    #[test]
    fn test_find_cycles() {
        let mut graph = abc();
        graph.add_edge(&"a", &"b", "");
        graph.add_edge(&"b", &"c", "");
        assert!(graph.find_cycles().is_empty());

        graph.add_edge(&"c", &"a", "");
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        let mut members: Vec<&str> = cycles[0].iter().map(|k| **k).collect();
        members.sort();
        assert_eq!(members, ["a", "b", "c"]);
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let mut graph = abc();
        graph.add_edge(&"a", &"a", "");
        assert_eq!(graph.find_cycles().len(), 1);
    }

    #[test]
    fn test_to_dot() {
        let mut graph = abc();
        graph.add_edge(&"a", &"b", "");
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"a\" -> \"b\";"));
    }
}
