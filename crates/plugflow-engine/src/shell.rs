//! Plug shells: a plug bound to one node instance.
//!
//! A [`PlugShell`] is a plain `(node, plug)` pair. It carries no state; the
//! cache and the connections of a shell live in the [`DepGraph`] that owns
//! the node. [`PlugHandle`] bundles a shell with a mutable borrow of its graph
//! so call sites can write `graph.plug(node, "out")?.get(Mode::DEFAULT)`.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};

use plugflow_core::{NodeId, Object, PlugId, Value};

use crate::error::EngineError;
use crate::graph::DepGraph;

/// A plug bound to a node instance. Identity is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlugShell {
    pub node: NodeId,
    pub plug: PlugId,
}

impl PlugShell {
    pub fn new(node: NodeId, plug: PlugId) -> Self {
        PlugShell { node, plug }
    }
}

impl fmt::Display for PlugShell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.plug)
    }
}

/// Opaque evaluation mode, passed through to `compute` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Mode(pub u32);

impl Mode {
    pub const DEFAULT: Mode = Mode(0);
}

/// One cached plug value.
///
/// Weak slots hold a non-owning handle to an object value; once every other
/// owner drops the object the slot reads as empty.
#[derive(Debug, Clone)]
pub(crate) enum CacheSlot {
    Owned(Value),
    Weak(Weak<Object>),
}

impl CacheSlot {
    pub(crate) fn store(value: Value, weak: bool) -> Self {
        match value {
            Value::Object(obj) if weak => CacheSlot::Weak(Arc::downgrade(&obj)),
            other => CacheSlot::Owned(other),
        }
    }

    pub(crate) fn load(&self) -> Option<Value> {
        match self {
            CacheSlot::Owned(value) => Some(value.clone()),
            CacheSlot::Weak(handle) => handle.upgrade().map(Value::Object),
        }
    }
}

/// A shell together with a mutable borrow of its graph.
#[derive(Debug)]
pub struct PlugHandle<'g> {
    graph: &'g mut DepGraph,
    shell: PlugShell,
}

impl<'g> PlugHandle<'g> {
    pub(crate) fn new(graph: &'g mut DepGraph, shell: PlugShell) -> Self {
        PlugHandle { graph, shell }
    }

    pub fn shell(&self) -> PlugShell {
        self.shell
    }

    pub fn graph(&mut self) -> &mut DepGraph {
        self.graph
    }

    pub fn get(&mut self, mode: Mode) -> Result<Value, EngineError> {
        self.graph.get(self.shell, mode)
    }

    pub fn set(&mut self, value: impl Into<Value>) -> Result<(), EngineError> {
        self.graph.set(self.shell, value.into())
    }

    /// Connects this shell as the source of `dst`.
    pub fn connect(&mut self, dst: PlugShell, force: bool) -> Result<PlugShell, EngineError> {
        self.graph.connect(self.shell, dst, force)
    }

    pub fn disconnect(&mut self, dst: PlugShell) -> bool {
        self.graph.disconnect(self.shell, dst)
    }

    pub fn input(&self) -> Option<PlugShell> {
        self.graph.input(self.shell)
    }

    pub fn outputs(&self) -> Vec<PlugShell> {
        self.graph.outputs(self.shell, |_| true)
    }

    pub fn has_cache(&self) -> bool {
        self.graph.has_cache(self.shell)
    }

    pub fn cache(&self) -> Result<Value, EngineError> {
        self.graph.cache(self.shell)
    }

    pub fn set_cache(&mut self, value: impl Into<Value>) -> Result<(), EngineError> {
        self.graph.set_cache(self.shell, value.into())
    }

    pub fn clear_cache(&mut self) -> Result<(), EngineError> {
        self.graph.clear_cache(self.shell)
    }

    pub fn compatibility_rating(&self, value: &Value) -> Result<u8, EngineError> {
        self.graph.compatibility_rating(self.shell, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugflow_core::TypeId;

    #[test]
    fn shells_compare_structurally() {
        let a = PlugShell::new(NodeId(1), PlugId(2));
        let b = PlugShell::new(NodeId(1), PlugId(2));
        assert_eq!(a, b);
        assert_ne!(a, PlugShell::new(NodeId(1), PlugId(3)));
        assert_eq!(a.to_string(), "1.2");
    }

    #[test]
    fn owned_slot_keeps_value_alive() {
        let value = Value::object(Object::new(TypeId::ANY));
        let slot = CacheSlot::store(value.clone(), false);
        drop(value);
        assert!(slot.load().is_some());
    }

    #[test]
    fn weak_slot_follows_owner() {
        let value = Value::object(Object::new(TypeId::ANY));
        let slot = CacheSlot::store(value.clone(), true);
        assert!(slot.load().is_some_and(|v| v.same_handle(&value)));
        drop(value);
        assert!(slot.load().is_none());
    }

    #[test]
    fn weak_flag_ignored_for_plain_values() {
        let slot = CacheSlot::store(Value::Float(1.5), true);
        assert_eq!(slot.load(), Some(Value::Float(1.5)));
    }
}
