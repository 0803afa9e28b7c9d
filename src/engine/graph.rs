//! Reference Dependency Graph
//!
//! Directed graph of name -> name reference edges between the definitions
//! of a [`Context`]. Used by the cyclic packager to compute dependency
//! closures and by the CLI to report reference cycles.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::node::Context;

/// Reference graph over the names of one context.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Build the graph from every definition of `context`.
    ///
    /// Names are added in context order; referenced names missing from the
    /// context become dangling nodes after them.
    pub fn from_context(context: &Context) -> Self {
        let mut graph = Self::default();
        for name in context.names() {
            graph.add(name);
        }
        for (name, node) in context.iter() {
            let from = graph.add(name);
            for reference in node.references() {
                let to = graph.add(&reference);
                graph.graph.update_edge(from, to, ());
            }
        }
        graph
    }

    fn add(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.indices.insert(name.to_string(), idx);
        idx
    }

    pub fn name_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Names directly referenced by `name`.
    pub fn refs_out(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        out.sort();
        out.into_iter().map(|i| self.graph[i].as_str()).collect()
    }

    /// `name` plus every name transitively reachable from it, in graph order.
    pub fn closure(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.indices.get(name) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                stack.push(edge.target());
            }
        }
        let mut reached: Vec<NodeIndex> = visited.into_iter().collect();
        reached.sort();
        reached.into_iter().map(|i| self.graph[i].clone()).collect()
    }

    /// Reference cycles: strongly connected groups with more than one member,
    /// or a single name referencing itself. Members are in graph order.
    pub fn scc_groups(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<NodeIndex>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [idx] => self
                    .graph
                    .edges_directed(*idx, Direction::Outgoing)
                    .any(|e| e.target() == *idx),
                _ => true,
            })
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        groups.sort();
        groups
            .into_iter()
            .map(|scc| scc.into_iter().map(|i| self.graph[i].clone()).collect())
            .collect()
    }
}
