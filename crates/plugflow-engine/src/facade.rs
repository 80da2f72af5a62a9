//! Facades: one graph node standing in for a wrapped node or sub-graph.
//!
//! A facade is an ordinary [`DepGraph`] node whose schema mirrors the plugs it
//! exposes: the same attributes and the same `affects` edges among the
//! mirrored plugs, so a facade plug is an input or an output exactly when the
//! wrapped plug is. Its lookup table maps each exposed name to an
//! [`IoFacadePlug`], a non-owning `(name, shell)` handle.
//!
//! Value operations on a facade shell are forwarded to the wrapped shell.
//! Connections stay on the facade shell. When the wrapped node pulls one of
//! its own inputs it first asks the override table whether a facade has an
//! outside connection for it, so an edge into the facade replaces whatever
//! feeds the wrapped plug internally. With nested facades the outermost
//! connection wins.
//!
//! Two constructors exist:
//!
//! - [`DepGraph::wrap_node`] wraps a node already in the graph and exposes
//!   its plugs under their own names.
//! - [`DepGraph::wrap_graph`] copies a whole template graph into this one,
//!   privately owned by the facade, and exposes its plugs as `node_plug`.

use std::collections::HashMap;
use std::sync::Arc;

use plugflow_core::{CoreError, NodeId, NodeSchema, PlugId, MAX_PLUGS};

use crate::error::EngineError;
use crate::graph::{DepGraph, NodeEntry, NodeKind};
use crate::shell::PlugShell;

/// An exposed facade plug and the shell it forwards to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFacadePlug {
    name: String,
    target: PlugShell,
}

impl IoFacadePlug {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> PlugShell {
        self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacadeKind {
    /// Wraps one node of the same graph.
    Node,
    /// Wraps a private copy of another graph.
    Graph,
}

/// Lookup table of a facade node. `plugs[i]` backs the facade plug `PlugId(i)`.
#[derive(Debug, Clone)]
pub(crate) struct FacadeState {
    pub(crate) plugs: Vec<IoFacadePlug>,
    pub(crate) wrapped: Vec<NodeId>,
    pub(crate) kind: FacadeKind,
}

impl DepGraph {
    /// Wraps `node` in a new facade node called `name`.
    pub fn wrap_node(&mut self, name: &str, node: NodeId) -> Result<NodeId, EngineError> {
        self.check_name(name)?;
        let schema = Arc::clone(&self.entry(node)?.schema);
        let exposed = schema
            .plugs()
            .iter()
            .map(|p| (p.name().to_string(), PlugShell::new(node, p.id())))
            .collect();

        let id = self.allocate_id();
        let type_name = format!("{}Facade", schema.type_name());
        self.install_facade(id, name, &type_name, FacadeKind::Node, exposed, vec![node])?;
        Ok(id)
    }

    /// Copies `template` into this graph behind a new facade node.
    ///
    /// Both graphs must share one type registry. Copies are named
    /// `"{name}/{node}"` and keep the template's caches and connections; the
    /// template itself is left untouched.
    pub fn wrap_graph(&mut self, name: &str, template: &DepGraph) -> Result<NodeId, EngineError> {
        if !Arc::ptr_eq(self.types_arc(), template.types_arc()) {
            return Err(EngineError::RegistryMismatch);
        }
        self.check_name(name)?;
        let copy_name = |node: &str| format!("{name}/{node}");
        for entry in template.nodes.values() {
            self.check_name(&copy_name(&entry.name))?;
        }

        let facade_id = self.allocate_id();
        let remap: HashMap<NodeId, NodeId> = template
            .nodes
            .keys()
            .map(|&old| (old, self.allocate_id()))
            .collect();
        let remap_shell = |shell: PlugShell| {
            remap
                .get(&shell.node)
                .map(|&node| PlugShell::new(node, shell.plug))
                .ok_or(EngineError::NodeNotFound { id: shell.node })
        };

        // Build every copy before touching this graph.
        let mut copies = Vec::with_capacity(template.nodes.len());
        for (old_id, entry) in &template.nodes {
            let kind = match &entry.kind {
                NodeKind::Compute(behavior) => NodeKind::Compute(Arc::clone(behavior)),
                NodeKind::Facade(state) => NodeKind::Facade(FacadeState {
                    plugs: state
                        .plugs
                        .iter()
                        .map(|io| {
                            Ok(IoFacadePlug {
                                name: io.name.clone(),
                                target: remap_shell(io.target)?,
                            })
                        })
                        .collect::<Result<_, EngineError>>()?,
                    wrapped: state
                        .wrapped
                        .iter()
                        .filter_map(|n| remap.get(n).copied())
                        .collect(),
                    kind: state.kind,
                }),
            };
            let owner = entry
                .owner
                .and_then(|o| remap.get(&o).copied())
                .unwrap_or(facade_id);
            copies.push((
                remap[old_id],
                NodeEntry {
                    name: copy_name(&entry.name),
                    schema: Arc::clone(&entry.schema),
                    kind,
                    cache: entry.cache.clone(),
                    owner: Some(owner),
                },
            ));
        }
        let edges = template
            .connections
            .edges()
            .map(|(src, dst)| Ok((remap_shell(src)?, remap_shell(dst)?)))
            .collect::<Result<Vec<_>, EngineError>>()?;
        let overrides = template
            .overrides
            .iter()
            .map(|(&wrapped, &facade)| Ok((remap_shell(wrapped)?, remap_shell(facade)?)))
            .collect::<Result<Vec<_>, EngineError>>()?;

        // Top-level plugs not already behind an inner facade.
        let mut exposed = Vec::new();
        let mut wrapped = Vec::new();
        for (old_id, entry) in &template.nodes {
            if entry.owner.is_some() {
                continue;
            }
            let new_id = remap[old_id];
            wrapped.push(new_id);
            for plug in entry.schema.plugs() {
                if template
                    .overrides
                    .contains_key(&PlugShell::new(*old_id, plug.id()))
                {
                    continue;
                }
                exposed.push((
                    format!("{}_{}", entry.name, plug.name()),
                    PlugShell::new(new_id, plug.id()),
                ));
            }
        }

        if exposed.len() > MAX_PLUGS {
            return Err(CoreError::TooManyPlugs {
                node_type: "GraphFacade".to_string(),
                limit: MAX_PLUGS,
            }
            .into());
        }

        for (id, entry) in copies {
            self.insert_entry(id, entry);
        }
        for (src, dst) in edges {
            self.connections.add_edge(src, dst);
        }
        self.overrides.extend(overrides);

        if let Err(err) =
            self.install_facade(facade_id, name, "GraphFacade", FacadeKind::Graph, exposed, wrapped)
        {
            for &id in remap.values() {
                // nested copies may already be gone with their owner
                let _ = self.remove_node(id);
            }
            return Err(err);
        }
        Ok(facade_id)
    }

    pub fn is_facade(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.get(&node).map(|e| &e.kind),
            Some(NodeKind::Facade(_))
        )
    }

    pub fn facade_kind(&self, facade: NodeId) -> Result<FacadeKind, EngineError> {
        Ok(self.facade_state(facade)?.kind)
    }

    /// The lookup table of a facade, in plug order.
    pub fn facade_plugs(&self, facade: NodeId) -> Result<&[IoFacadePlug], EngineError> {
        Ok(&self.facade_state(facade)?.plugs)
    }

    /// Resolves an exposed name, failing with
    /// [`EngineError::AttributeNotFound`].
    pub fn facade_plug(&self, facade: NodeId, name: &str) -> Result<&IoFacadePlug, EngineError> {
        let state = self.facade_state(facade)?;
        state
            .plugs
            .iter()
            .find(|io| io.name == name)
            .ok_or_else(|| EngineError::AttributeNotFound {
                facade: self.describe_node(facade),
                name: name.to_string(),
            })
    }

    /// Nodes the facade wraps: the wrapped node, or the top-level copies.
    pub fn wrapped_nodes(&self, facade: NodeId) -> Result<&[NodeId], EngineError> {
        Ok(&self.facade_state(facade)?.wrapped)
    }

    /// The facade shell overriding `shell`, if it is wrapped.
    pub fn facade_of(&self, shell: PlugShell) -> Option<PlugShell> {
        self.overrides.get(&shell).copied()
    }

    fn facade_state(&self, node: NodeId) -> Result<&FacadeState, EngineError> {
        match &self.entry(node)?.kind {
            NodeKind::Facade(state) => Ok(state),
            NodeKind::Compute(_) => Err(EngineError::NotAFacade {
                node: self.describe_node(node),
            }),
        }
    }

    fn describe_node(&self, node: NodeId) -> String {
        self.node_name(node)
            .map(str::to_string)
            .unwrap_or_else(|_| format!("#{node}"))
    }

    /// Builds the mirrored schema, registers the facade node and installs
    /// its overrides.
    fn install_facade(
        &mut self,
        id: NodeId,
        name: &str,
        type_name: &str,
        kind: FacadeKind,
        exposed: Vec<(String, PlugShell)>,
        wrapped: Vec<NodeId>,
    ) -> Result<(), EngineError> {
        for (_, target) in &exposed {
            if let Some(existing) = self.overrides.get(target) {
                if existing.node != id {
                    return Err(EngineError::AlreadyFacaded {
                        shell: self.describe(*target),
                        facade: self.describe_node(existing.node),
                    });
                }
            }
        }

        let mut schema = NodeSchema::new(type_name);
        let mut ids = Vec::with_capacity(exposed.len());
        let mut by_target: HashMap<PlugShell, PlugId> = HashMap::new();
        for (exposed_name, target) in &exposed {
            let attribute = self.attribute(*target)?.clone();
            let plug = schema.add_plug(exposed_name, attribute)?;
            ids.push(plug);
            by_target.insert(*target, plug);
        }
        for (&from, (_, target)) in ids.iter().zip(&exposed) {
            for &affected in self.plug_def(*target)?.affects() {
                if let Some(&to) = by_target.get(&PlugShell::new(target.node, affected)) {
                    schema.add_affects(from, to)?;
                }
            }
        }

        let plugs: Vec<IoFacadePlug> = exposed
            .into_iter()
            .map(|(name, target)| IoFacadePlug { name, target })
            .collect();
        for (&plug, io) in ids.iter().zip(&plugs) {
            self.overrides.insert(io.target, PlugShell::new(id, plug));
        }
        tracing::debug!(
            "facade '{}' ({:?}) exposes {} plug(s) of {} node(s)",
            name,
            kind,
            plugs.len(),
            wrapped.len()
        );
        self.insert_entry(
            id,
            NodeEntry {
                name: name.to_string(),
                schema: Arc::new(schema),
                kind: NodeKind::Facade(FacadeState {
                    plugs,
                    wrapped,
                    kind,
                }),
                cache: HashMap::new(),
                owner: None,
            },
        );
        Ok(())
    }
}
