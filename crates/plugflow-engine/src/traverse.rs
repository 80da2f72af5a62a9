//! Lazy walks over the dependency structure.
//!
//! A walk follows two kinds of edges: the internal `affects` edges declared
//! on node schemas and the external connections between shells. Upstream,
//! an output plug leads to the plugs it is affected by and any other plug
//! leads to its connection source. Downstream, an input plug leads to the
//! plugs it affects, and every plug leads to its connection targets.
//!
//! Walks see the raw structure: facade overrides are not followed.

use std::collections::{HashSet, VecDeque};

use plugflow_core::PlugId;

use crate::graph::DepGraph;
use crate::shell::PlugShell;

/// Which way edges are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Towards inputs.
    Up,
    /// Towards outputs.
    #[default]
    Down,
}

/// Order in which pending shells are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Pending shells form a queue.
    #[default]
    BreadthFirst,
    /// Pending shells form a stack; the first neighbour is walked first.
    DepthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalOptions {
    pub direction: Direction,
    pub order: Order,
    /// Yield and expand each shell at most once. Without it a cyclic graph
    /// yields forever.
    pub visit_once: bool,
}

impl TraversalOptions {
    pub fn up() -> Self {
        TraversalOptions {
            direction: Direction::Up,
            ..Self::default()
        }
    }

    pub fn down() -> Self {
        TraversalOptions {
            direction: Direction::Down,
            ..Self::default()
        }
    }

    pub fn depth_first(mut self) -> Self {
        self.order = Order::DepthFirst;
        self
    }

    pub fn visit_once(mut self) -> Self {
        self.visit_once = true;
        self
    }
}

/// Starts a walk at `root`.
///
/// A shell for which `stop` returns `true` is neither yielded nor expanded.
/// A shell for which `prune` returns `true` is expanded but not yielded.
pub fn iter_plugs<S, P>(
    graph: &DepGraph,
    root: PlugShell,
    options: TraversalOptions,
    stop: S,
    prune: P,
) -> IterPlugs<'_, S, P>
where
    S: FnMut(PlugShell) -> bool,
    P: FnMut(PlugShell) -> bool,
{
    IterPlugs {
        graph,
        options,
        work: VecDeque::from([root]),
        visited: HashSet::new(),
        stop,
        prune,
    }
}

/// Iterator returned by [`iter_plugs`].
pub struct IterPlugs<'g, S, P> {
    graph: &'g DepGraph,
    options: TraversalOptions,
    work: VecDeque<PlugShell>,
    visited: HashSet<PlugShell>,
    stop: S,
    prune: P,
}

impl<S, P> IterPlugs<'_, S, P> {
    fn neighbours(&self, shell: PlugShell) -> Vec<PlugShell> {
        let Ok(plug) = self.graph.plug_def(shell) else {
            return Vec::new();
        };
        let internal = |ids: &[PlugId]| {
            ids.iter()
                .map(|&id| PlugShell::new(shell.node, id))
                .collect::<Vec<_>>()
        };

        match self.options.direction {
            Direction::Up => {
                if plug.provides_output() {
                    internal(plug.affected_by())
                } else {
                    self.graph.input(shell).into_iter().collect()
                }
            }
            Direction::Down => {
                let mut out = if plug.provides_input() {
                    internal(plug.affects())
                } else {
                    Vec::new()
                };
                out.extend(self.graph.outputs(shell, |_| true));
                out
            }
        }
    }
}

impl<S, P> Iterator for IterPlugs<'_, S, P>
where
    S: FnMut(PlugShell) -> bool,
    P: FnMut(PlugShell) -> bool,
{
    type Item = PlugShell;

    fn next(&mut self) -> Option<PlugShell> {
        loop {
            let shell = match self.options.order {
                Order::BreadthFirst => self.work.pop_front()?,
                Order::DepthFirst => self.work.pop_back()?,
            };
            if self.options.visit_once && !self.visited.insert(shell) {
                continue;
            }
            if (self.stop)(shell) {
                continue;
            }

            let next = self.neighbours(shell);
            match self.options.order {
                Order::BreadthFirst => self.work.extend(next),
                Order::DepthFirst => self.work.extend(next.into_iter().rev()),
            }

            if !(self.prune)(shell) {
                return Some(shell);
            }
        }
    }
}

impl DepGraph {
    /// Walks from `root` without predicates.
    pub fn iter_plugs(
        &self,
        root: PlugShell,
        options: TraversalOptions,
    ) -> IterPlugs<'_, fn(PlugShell) -> bool, fn(PlugShell) -> bool> {
        let never: fn(PlugShell) -> bool = |_| false;
        iter_plugs(self, root, options, never, never)
    }
}
