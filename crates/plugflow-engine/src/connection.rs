//! ConnectionGraph: the external edges between plug shells.
//!
//! Vertices are [`PlugShell`]s, an edge `a -> b` means "b reads its value from
//! a". A destination has at most one incoming edge; the [`DepGraph`] enforces
//! that when connecting, this container only stores what it is told.
//!
//! Vertices exist only while they take part in an edge. Removing the last edge
//! of a shell removes its vertex too.
//!
//! [`DepGraph`]: crate::DepGraph

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::{Directed, Direction};

use plugflow_core::NodeId;

use crate::shell::PlugShell;

/// Directed graph of plug-to-plug connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    graph: StableGraph<PlugShell, (), Directed, u32>,
    /// Vertex lookup for every shell currently in the graph
    index: HashMap<PlugShell, NodeIndex<u32>>,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the edge `src -> dst`. Returns `false` if it already existed.
    pub fn add_edge(&mut self, src: PlugShell, dst: PlugShell) -> bool {
        let a = self.vertex(src);
        let b = self.vertex(dst);
        if self.graph.find_edge(a, b).is_some() {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    /// Removes the edge `src -> dst` if present, then drops vertices left
    /// without edges.
    pub fn remove_edge(&mut self, src: PlugShell, dst: PlugShell) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(&src), self.index.get(&dst)) else {
            return false;
        };
        let Some(edge) = self.graph.find_edge(a, b) else {
            return false;
        };
        self.graph.remove_edge(edge);
        self.drop_if_orphan(src);
        self.drop_if_orphan(dst);
        true
    }

    pub fn has_edge(&self, src: PlugShell, dst: PlugShell) -> bool {
        match (self.index.get(&src), self.index.get(&dst)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// The single source feeding `dst`, if any.
    pub fn input(&self, dst: PlugShell) -> Option<PlugShell> {
        self.predecessors(dst).into_iter().next()
    }

    pub fn predecessors(&self, shell: PlugShell) -> Vec<PlugShell> {
        self.neighbors(shell, Direction::Incoming)
    }

    /// Shells fed by `shell`, in connection order.
    pub fn successors(&self, shell: PlugShell) -> Vec<PlugShell> {
        self.neighbors(shell, Direction::Outgoing)
    }

    /// Removes a shell and all its edges. Neighbours left without edges are
    /// dropped as well.
    pub fn remove_vertex(&mut self, shell: PlugShell) -> bool {
        let Some(idx) = self.index.remove(&shell) else {
            return false;
        };
        let neighbours: Vec<PlugShell> = self
            .graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n])
            .collect();
        self.graph.remove_node(idx);
        for other in neighbours {
            self.drop_if_orphan(other);
        }
        true
    }

    /// Removes every shell belonging to `node`.
    pub fn remove_node_shells(&mut self, node: NodeId) {
        let shells: Vec<PlugShell> = self
            .index
            .keys()
            .filter(|shell| shell.node == node)
            .copied()
            .collect();
        for shell in shells {
            self.remove_vertex(shell);
        }
    }

    /// All `(src, dst)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (PlugShell, PlugShell)> + '_ {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a], self.graph[b]))
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    fn vertex(&mut self, shell: PlugShell) -> NodeIndex<u32> {
        if let Some(&idx) = self.index.get(&shell) {
            return idx;
        }
        let idx = self.graph.add_node(shell);
        self.index.insert(shell, idx);
        idx
    }

    fn neighbors(&self, shell: PlugShell, dir: Direction) -> Vec<PlugShell> {
        let Some(&idx) = self.index.get(&shell) else {
            return Vec::new();
        };
        // petgraph walks the most recent edge first
        let mut out: Vec<PlugShell> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n])
            .collect();
        out.reverse();
        out
    }

    fn drop_if_orphan(&mut self, shell: PlugShell) {
        let Some(&idx) = self.index.get(&shell) else {
            return;
        };
        if self.graph.neighbors_undirected(idx).next().is_none() {
            self.graph.remove_node(idx);
            self.index.remove(&shell);
        }
    }
}
