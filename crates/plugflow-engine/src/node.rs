//! The node behavior trait and plug matching helpers.
//!
//! A node type is a [`NodeSchema`] plus a [`Node`] implementation that
//! computes its output plugs. Node behaviors are stateless: every value a
//! node holds lives in the caches of its [`DepGraph`] entry, so one behavior
//! object may back many graph nodes.

use std::fmt;
use std::sync::Arc;

use plugflow_core::{Attribute, NodeId, NodeSchema, Plug, PlugId, TypeRegistry, Value};

use crate::error::{ComputeError, EngineError};
use crate::graph::DepGraph;
use crate::shell::{Mode, PlugShell};

/// Behavior of a node type.
pub trait Node: fmt::Debug {
    /// The plug declarations shared by every instance.
    fn schema(&self) -> Arc<NodeSchema>;

    /// Computes the value of an output `plug` of the node `ctx.node()`.
    ///
    /// Inputs are pulled through `ctx`. Errors from those pulls convert into
    /// [`ComputeError`] with `?` and reach the caller unchanged.
    fn compute(
        &self,
        ctx: &mut ComputeContext<'_>,
        plug: &Plug,
        mode: Mode,
    ) -> Result<Value, ComputeError>;
}

/// Access to the graph from inside [`Node::compute`].
#[derive(Debug)]
pub struct ComputeContext<'g> {
    graph: &'g mut DepGraph,
    node: NodeId,
}

impl<'g> ComputeContext<'g> {
    pub(crate) fn new(graph: &'g mut DepGraph, node: NodeId) -> Self {
        ComputeContext { graph, node }
    }

    /// The node being computed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn graph(&mut self) -> &mut DepGraph {
        self.graph
    }

    pub fn types(&self) -> &TypeRegistry {
        self.graph.types()
    }

    /// Shell of one of this node's plugs.
    pub fn shell(&self, name: &str) -> Result<PlugShell, EngineError> {
        self.graph.shell(self.node, name)
    }

    /// Pulls one of this node's plugs.
    pub fn get(&mut self, name: &str, mode: Mode) -> Result<Value, EngineError> {
        let shell = self.shell(name)?;
        self.graph.get(shell, mode)
    }
}

/// What candidate plugs are matched against in [`filter_compatible_plugs`].
#[derive(Debug, Clone, Copy)]
pub enum PlugMatch<'a> {
    /// Rate a value against each candidate slot.
    Value(&'a Value),
    /// Rate each candidate as the destination of this source attribute.
    Source(&'a Attribute),
    /// Rate each candidate as the source feeding this destination attribute.
    Destination(&'a Attribute),
}

impl PlugMatch<'_> {
    fn rate(&self, plug: &Plug, registry: &TypeRegistry) -> u8 {
        match self {
            PlugMatch::Value(value) => plug.attribute().compatibility_rating(value, registry),
            PlugMatch::Source(src) => src.connection_affinity(plug.attribute(), registry),
            PlugMatch::Destination(dst) => plug.attribute().connection_affinity(dst, registry),
        }
    }
}

/// Rates `plugs` against `against` and returns the non-zero ratings sorted
/// best first. Equal ratings keep the order of `plugs`.
///
/// With `raise_on_ambiguity`, a tie at the top rating is an error, so
/// auto-wiring never picks a plug arbitrarily.
pub fn filter_compatible_plugs<'p>(
    plugs: impl IntoIterator<Item = &'p Plug>,
    against: PlugMatch<'_>,
    registry: &TypeRegistry,
    raise_on_ambiguity: bool,
) -> Result<Vec<(u8, PlugId)>, EngineError> {
    let mut rated: Vec<(u8, &Plug)> = plugs
        .into_iter()
        .map(|plug| (against.rate(plug, registry), plug))
        .filter(|(rating, _)| *rating > 0)
        .collect();
    rated.sort_by(|a, b| b.0.cmp(&a.0));

    if raise_on_ambiguity {
        if let [(best, _), (second, _), ..] = rated.as_slice() {
            if best == second {
                let rating = *best;
                let candidates = rated
                    .iter()
                    .take_while(|(r, _)| *r == rating)
                    .map(|(_, plug)| plug.name().to_string())
                    .collect();
                return Err(EngineError::AmbiguousPlugs { candidates, rating });
            }
        }
    }

    Ok(rated.into_iter().map(|(r, plug)| (r, plug.id())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugflow_core::TypeId;

    fn schema() -> Arc<NodeSchema> {
        NodeSchema::builder("Mixed")
            .plug("count", Attribute::new(TypeId::INT).writable())
            .plug("flag", Attribute::new(TypeId::BOOL).writable())
            .plug("ratio", Attribute::new(TypeId::FLOAT).writable())
            .plug("anything", Attribute::new(TypeId::ANY).writable())
            .build()
            .unwrap()
    }

    #[test]
    fn value_ratings_sorted_best_first() {
        let reg = TypeRegistry::new();
        let schema = schema();
        let rated = filter_compatible_plugs(
            schema.plugs(),
            PlugMatch::Value(&Value::Bool(true)),
            &reg,
            false,
        )
        .unwrap();
        // bool: exact on flag, int one level up, any two levels up
        assert_eq!(
            rated,
            vec![(255, PlugId(1)), (170, PlugId(0)), (85, PlugId(3))]
        );
    }

    #[test]
    fn source_attribute_rates_destinations() {
        let reg = TypeRegistry::new();
        let schema = schema();
        let src = Attribute::new(TypeId::FLOAT);
        let rated =
            filter_compatible_plugs(schema.plugs(), PlugMatch::Source(&src), &reg, true).unwrap();
        assert_eq!(rated, vec![(255, PlugId(2)), (127, PlugId(3))]);
    }

    #[test]
    fn destination_attribute_rates_sources() {
        let reg = TypeRegistry::new();
        let schema = schema();
        let dst = Attribute::new(TypeId::INT);
        let rated =
            filter_compatible_plugs(schema.plugs(), PlugMatch::Destination(&dst), &reg, false)
                .unwrap();
        assert_eq!(rated, vec![(255, PlugId(0)), (170, PlugId(1))]);
    }

    #[test]
    fn tie_at_the_top_is_ambiguous() {
        let reg = TypeRegistry::new();
        let schema = NodeSchema::builder("Twins")
            .plug("a", Attribute::new(TypeId::FLOAT))
            .plug("b", Attribute::new(TypeId::FLOAT))
            .build()
            .unwrap();
        let value = Value::Float(1.0);

        let err = filter_compatible_plugs(schema.plugs(), PlugMatch::Value(&value), &reg, true)
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r#"ambiguous plugs for auto-wiring: ["a", "b"] share rating 255"#);

        // without the flag the declaration order breaks the tie
        let rated =
            filter_compatible_plugs(schema.plugs(), PlugMatch::Value(&value), &reg, false).unwrap();
        assert_eq!(rated, vec![(255, PlugId(0)), (255, PlugId(1))]);
    }
}
