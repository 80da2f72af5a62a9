//! Property tests for caching, connection cardinality and value round-trips.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use proptest::prelude::*;

use plugflow_core::{Attribute, NodeSchema, Plug, TypeId, TypeRegistry, Value};
use plugflow_engine::{ComputeContext, ComputeError, DepGraph, EngineError, Mode, Node, PlugShell};

/// `out = in * 2`, counting computations.
#[derive(Debug, Default)]
struct Double {
    computed: Rc<Cell<usize>>,
}

impl Node for Double {
    fn schema(&self) -> Arc<NodeSchema> {
        NodeSchema::builder("Double")
            .plug("in", Attribute::new(TypeId::FLOAT).writable().with_default(0.0))
            .plug("out", Attribute::new(TypeId::FLOAT))
            .affects("in", "out")
            .build()
            .unwrap()
    }

    fn compute(
        &self,
        ctx: &mut ComputeContext<'_>,
        _plug: &Plug,
        mode: Mode,
    ) -> Result<Value, ComputeError> {
        self.computed.set(self.computed.get() + 1);
        let input = ctx.get("in", mode)?.as_float().unwrap_or_default();
        Ok(Value::Float(input * 2.0))
    }
}

/// One writable input of a fixed class feeding an untyped output.
#[derive(Debug)]
struct Typed(TypeId);

impl Node for Typed {
    fn schema(&self) -> Arc<NodeSchema> {
        NodeSchema::builder("Typed")
            .plug("slot", Attribute::new(self.0).writable())
            .plug("seen", Attribute::new(TypeId::ANY))
            .affects("slot", "seen")
            .build()
            .unwrap()
    }

    fn compute(
        &self,
        ctx: &mut ComputeContext<'_>,
        _plug: &Plug,
        mode: Mode,
    ) -> Result<Value, ComputeError> {
        Ok(ctx.get("slot", mode)?)
    }
}

fn graph() -> DepGraph {
    DepGraph::new(Arc::new(TypeRegistry::new()))
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::Str),
        prop_oneof![Just(TypeId::INT), Just(TypeId::FLOAT), Just(TypeId::STR)].prop_map(Value::Type),
    ];
    leaf.prop_recursive(2, 8, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::List)
    })
}

fn arb_declared() -> impl Strategy<Value = TypeId> {
    prop_oneof![
        Just(TypeId::ANY),
        Just(TypeId::NONE),
        Just(TypeId::INT),
        Just(TypeId::BOOL),
        Just(TypeId::FLOAT),
        Just(TypeId::STR),
        Just(TypeId::LIST),
        Just(TypeId::TYPE),
    ]
}

proptest! {
    /// Two pulls without an intervening write compute once and agree.
    #[test]
    fn cache_idempotence(input in -1.0e6f64..1.0e6) {
        let mut g = graph();
        let node = Double::default();
        let computed = Rc::clone(&node.computed);
        let id = g.add_node("d", node).unwrap();
        g.plug(id, "in").unwrap().set(input).unwrap();

        let out = g.shell(id, "out").unwrap();
        let first = g.get(out, Mode::DEFAULT).unwrap();
        let second = g.get(out, Mode::DEFAULT).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, Value::Float(input * 2.0));
        prop_assert_eq!(computed.get(), 1);
    }

    /// No shell ever has more than one source, whatever the sequence of
    /// connects, and only forced connects replace a source.
    #[test]
    fn connection_cardinality(
        ops in prop::collection::vec((0usize..4, 0usize..4, any::<bool>()), 1..24),
    ) {
        let mut g = graph();
        let ids: Vec<_> = (0..4)
            .map(|i| g.add_node(&format!("n{i}"), Double::default()).unwrap())
            .collect();
        let outs: Vec<PlugShell> = ids.iter().map(|&id| g.shell(id, "out").unwrap()).collect();
        let ins: Vec<PlugShell> = ids.iter().map(|&id| g.shell(id, "in").unwrap()).collect();

        for (from, to, force) in ops {
            let (src, dst) = (outs[from], ins[to]);
            let before = g.input(dst);
            let result = g.connect(src, dst, force);
            match before {
                Some(existing) if existing != src && !force => {
                    let is_already_connected = matches!(result, Err(EngineError::AlreadyConnected { .. }));
                    prop_assert!(is_already_connected);
                    prop_assert_eq!(g.input(dst), Some(existing));
                }
                _ => {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(g.input(dst), Some(src));
                }
            }
            for &shell in &ins {
                prop_assert!(g.connection_graph().predecessors(shell).len() <= 1);
            }
        }
    }

    /// Any value a slot accepts comes back unchanged.
    #[test]
    fn compatibility_round_trip(declared in arb_declared(), value in arb_value()) {
        let mut g = graph();
        let id = g.add_node("t", Typed(declared)).unwrap();
        let slot = g.shell(id, "slot").unwrap();

        let rating = g.compatibility_rating(slot, &value).unwrap();
        let result = g.set(slot, value.clone());
        if rating > 0 {
            prop_assert!(result.is_ok());
            prop_assert_eq!(g.get(slot, Mode::DEFAULT).unwrap(), value.clone());
            let seen = g.shell(id, "seen").unwrap();
            prop_assert_eq!(g.get(seen, Mode::DEFAULT).unwrap(), value);
        } else {
            let is_incompatible = matches!(result, Err(EngineError::IncompatibleValue { .. }));
            prop_assert!(is_incompatible);
        }
    }
}
