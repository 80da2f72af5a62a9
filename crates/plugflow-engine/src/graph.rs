//! DepGraph: the session that owns nodes, caches and connections.
//!
//! [`DepGraph`] is the single entry point for building and evaluating a
//! dependency graph. It holds:
//!
//! - the shared [`TypeRegistry`] every attribute rating consults,
//! - one [`NodeEntry`] per node (name, schema, behavior or facade table, the
//!   per-plug cache and the owning facade, if any),
//! - the [`ConnectionGraph`] of external plug-to-plug edges,
//! - the facade override table mapping a wrapped shell to the facade shell
//!   that may supply its input from outside.
//!
//! # Pull evaluation
//!
//! [`DepGraph::get`] is a recursive pull. A cached value wins; an output plug
//! is computed by its node and cached; an input plug reads its effective
//! source, falling back to the attribute default. Nothing is pushed: writing a
//! value with [`DepGraph::set`] leaves dependent caches untouched, callers
//! clear them with [`DepGraph::clear_downstream_caches`] when needed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use plugflow_core::{
    AttrFlags, Attribute, CoreError, NodeId, NodeSchema, Plug, PlugId, TypeRegistry, Value,
};

use crate::config::EngineConfig;
use crate::connection::ConnectionGraph;
use crate::error::{ComputeError, EngineError};
use crate::facade::FacadeState;
use crate::node::{filter_compatible_plugs, ComputeContext, Node, PlugMatch};
use crate::shell::{CacheSlot, Mode, PlugHandle, PlugShell};
use crate::traverse::{iter_plugs, TraversalOptions};

/// What runs when an output plug of a node is pulled.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    /// An ordinary node with its behavior.
    Compute(Arc<dyn Node>),
    /// A facade forwarding to wrapped shells.
    Facade(FacadeState),
}

/// Per-node state held by the graph.
#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) name: String,
    pub(crate) schema: Arc<NodeSchema>,
    pub(crate) kind: NodeKind,
    pub(crate) cache: HashMap<PlugId, CacheSlot>,
    /// Graph facade holding the private copy this node belongs to
    pub(crate) owner: Option<NodeId>,
}

/// A dependency graph session.
#[derive(Debug)]
pub struct DepGraph {
    types: Arc<TypeRegistry>,
    config: EngineConfig,
    pub(crate) nodes: BTreeMap<NodeId, NodeEntry>,
    pub(crate) names: HashMap<String, NodeId>,
    pub(crate) connections: ConnectionGraph,
    /// wrapped shell -> facade shell
    pub(crate) overrides: HashMap<PlugShell, PlugShell>,
    next_node_id: u32,
    /// Current nesting of `compute` calls
    depth: usize,
    /// Inputs whose source is being pulled right now
    resolving: HashSet<PlugShell>,
}

impl DepGraph {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self::with_config(types, EngineConfig::default())
    }

    pub fn with_config(types: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        DepGraph {
            types,
            config,
            nodes: BTreeMap::new(),
            names: HashMap::new(),
            connections: ConnectionGraph::new(),
            overrides: HashMap::new(),
            next_node_id: 0,
            depth: 0,
            resolving: HashSet::new(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub(crate) fn types_arc(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn connection_graph(&self) -> &ConnectionGraph {
        &self.connections
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Adds a node under a unique name.
    pub fn add_node<N: Node + 'static>(&mut self, name: &str, node: N) -> Result<NodeId, EngineError> {
        self.add_shared_node(name, Arc::new(node))
    }

    /// Adds a node whose behavior object is shared with other nodes.
    pub fn add_shared_node(&mut self, name: &str, node: Arc<dyn Node>) -> Result<NodeId, EngineError> {
        self.check_name(name)?;
        let id = self.allocate_id();
        let schema = node.schema();
        self.insert_entry(
            id,
            NodeEntry {
                name: name.to_string(),
                schema,
                kind: NodeKind::Compute(node),
                cache: HashMap::new(),
                owner: None,
            },
        );
        Ok(id)
    }

    /// Removes a node with its connections, caches and facade overrides.
    /// Nodes owned by a removed graph facade go with it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), EngineError> {
        let entry = self
            .nodes
            .remove(&id)
            .ok_or(EngineError::NodeNotFound { id })?;
        self.names.remove(&entry.name);
        self.connections.remove_node_shells(id);
        self.overrides
            .retain(|wrapped, facade| wrapped.node != id && facade.node != id);

        let owned: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, e)| e.owner == Some(id))
            .map(|(&nid, _)| nid)
            .collect();
        for nid in owned {
            // an owned node may already be gone with a nested owner
            if self.nodes.contains_key(&nid) {
                self.remove_node(nid)?;
            }
        }
        tracing::debug!("removed node '{}'", entry.name);
        Ok(())
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn node_name(&self, id: NodeId) -> Result<&str, EngineError> {
        Ok(&self.entry(id)?.name)
    }

    pub fn schema(&self, id: NodeId) -> Result<&Arc<NodeSchema>, EngineError> {
        Ok(&self.entry(id)?.schema)
    }

    /// All node ids in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Graph facade a node was copied into, if any.
    pub fn owner(&self, id: NodeId) -> Result<Option<NodeId>, EngineError> {
        Ok(self.entry(id)?.owner)
    }

    /// Resolves a plug name on a node.
    ///
    /// Unknown names on a facade report [`EngineError::AttributeNotFound`].
    pub fn shell(&self, node: NodeId, name: &str) -> Result<PlugShell, EngineError> {
        let entry = self.entry(node)?;
        if let (NodeKind::Facade(_), None) = (&entry.kind, entry.schema.plug_id(name)) {
            return Err(EngineError::AttributeNotFound {
                facade: entry.name.clone(),
                name: name.to_string(),
            });
        }
        let plug = entry.schema.resolve(name)?;
        Ok(PlugShell::new(node, plug))
    }

    /// Borrows a plug of a node for value operations.
    pub fn plug(&mut self, node: NodeId, name: &str) -> Result<PlugHandle<'_>, EngineError> {
        let shell = self.shell(node, name)?;
        Ok(PlugHandle::new(self, shell))
    }

    /// The declaration of the plug behind `shell`.
    pub fn plug_def(&self, shell: PlugShell) -> Result<&Plug, EngineError> {
        let entry = self.entry(shell.node)?;
        entry
            .schema
            .plug(shell.plug)
            .ok_or_else(|| self.missing_plug(shell))
    }

    pub fn attribute(&self, shell: PlugShell) -> Result<&Attribute, EngineError> {
        self.plug_def(shell).map(Plug::attribute)
    }

    /// `node.plug` label used in errors and logs.
    pub fn describe(&self, shell: PlugShell) -> String {
        match self.nodes.get(&shell.node) {
            Some(entry) => match entry.schema.plug(shell.plug) {
                Some(plug) => format!("{}.{}", entry.name, plug.name()),
                None => format!("{}.#{}", entry.name, shell.plug),
            },
            None => format!("#{}.#{}", shell.node, shell.plug),
        }
    }

    pub fn plugs(&self, node: NodeId) -> Result<Vec<PlugShell>, EngineError> {
        let entry = self.entry(node)?;
        Ok(entry
            .schema
            .plugs()
            .iter()
            .map(|p| PlugShell::new(node, p.id()))
            .collect())
    }

    pub fn input_plugs(&self, node: NodeId) -> Result<Vec<PlugShell>, EngineError> {
        let entry = self.entry(node)?;
        Ok(entry
            .schema
            .input_plugs()
            .map(|p| PlugShell::new(node, p.id()))
            .collect())
    }

    pub fn output_plugs(&self, node: NodeId) -> Result<Vec<PlugShell>, EngineError> {
        let entry = self.entry(node)?;
        Ok(entry
            .schema
            .output_plugs()
            .map(|p| PlugShell::new(node, p.id()))
            .collect())
    }

    /// Rates the plugs of `node` against `against`, best first.
    pub fn filter_compatible_plugs(
        &self,
        node: NodeId,
        against: PlugMatch<'_>,
        raise_on_ambiguity: bool,
    ) -> Result<Vec<(u8, PlugShell)>, EngineError> {
        let entry = self.entry(node)?;
        let rated =
            filter_compatible_plugs(entry.schema.plugs(), against, &self.types, raise_on_ambiguity)?;
        Ok(rated
            .into_iter()
            .map(|(rating, plug)| (rating, PlugShell::new(node, plug)))
            .collect())
    }

    /// External connections touching `node`, as `(src, dst)` pairs. Incoming
    /// connections come first, each group in plug order.
    pub fn connections(
        &self,
        node: NodeId,
        include_input: bool,
        include_output: bool,
    ) -> Result<Vec<(PlugShell, PlugShell)>, EngineError> {
        let shells = self.plugs(node)?;
        let mut out = Vec::new();
        if include_input {
            for &shell in &shells {
                if let Some(src) = self.connections.input(shell) {
                    out.push((src, shell));
                }
            }
        }
        if include_output {
            for &shell in &shells {
                for dst in self.connections.successors(shell) {
                    out.push((shell, dst));
                }
            }
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    /// Pulls the value of a shell.
    ///
    /// Fails with [`EngineError::RecursionLimit`] when computes nest deeper
    /// than `max_pull_depth`, or when an input is reached again while its
    /// own source is still being pulled.
    pub fn get(&mut self, shell: PlugShell, mode: Mode) -> Result<Value, EngineError> {
        let target = self.resolve_target(shell)?;
        if target != shell {
            tracing::trace!(
                "forwarding {} to {}",
                self.describe(shell),
                self.describe(target)
            );
            return self.get(target, mode);
        }

        if let Some(value) = self.cached(shell)? {
            tracing::trace!("cache hit on {}", self.describe(shell));
            return Ok(value);
        }

        let entry = self.entry(shell.node)?;
        let schema = Arc::clone(&entry.schema);
        let behavior = match &entry.kind {
            NodeKind::Compute(behavior) => Some(Arc::clone(behavior)),
            NodeKind::Facade(_) => None,
        };
        let plug = schema
            .plug(shell.plug)
            .ok_or_else(|| self.missing_plug(shell))?;

        if plug.provides_output() {
            let Some(behavior) = behavior else {
                return Err(EngineError::PlugUnhandled {
                    shell: self.describe(shell),
                });
            };
            return self.compute(shell, behavior.as_ref(), plug, mode);
        }

        // Plugs without any internal edge read like inputs.
        match self.effective_input(shell) {
            Some(src) => {
                if !self.resolving.insert(shell) {
                    return Err(EngineError::RecursionLimit {
                        shell: self.describe(shell),
                        limit: self.config.max_pull_depth,
                    });
                }
                let result = self.get(src, mode);
                self.resolving.remove(&shell);
                result
            }
            None => plug
                .attribute()
                .default()
                .cloned()
                .ok_or_else(|| EngineError::MissingDefault {
                    shell: self.describe(shell),
                }),
        }
    }

    fn compute(
        &mut self,
        shell: PlugShell,
        behavior: &dyn Node,
        plug: &Plug,
        mode: Mode,
    ) -> Result<Value, EngineError> {
        if self.depth >= self.config.max_pull_depth {
            return Err(EngineError::RecursionLimit {
                shell: self.describe(shell),
                limit: self.config.max_pull_depth,
            });
        }
        tracing::trace!("computing {}", self.describe(shell));
        self.depth += 1;
        let result = {
            let mut ctx = ComputeContext::new(self, shell.node);
            behavior.compute(&mut ctx, plug, mode)
        };
        self.depth -= 1;
        let value = result.map_err(|err| self.translate(shell, err))?;

        let attribute = plug.attribute();
        if attribute.compatibility_rating(&value, &self.types) == 0 {
            return Err(EngineError::IncompatibleValue {
                shell: self.describe(shell),
                got: self.types.name_of(value.type_id()).to_string(),
            });
        }
        if !attribute.has_flag(AttrFlags::UNCACHED) {
            self.store(shell, value.clone(), attribute.has_flag(AttrFlags::WEAK_CACHE))?;
        }
        Ok(value)
    }

    fn translate(&self, shell: PlugShell, err: ComputeError) -> EngineError {
        match err {
            ComputeError::Failed(message) => EngineError::ComputeFailed {
                shell: self.describe(shell),
                message,
            },
            ComputeError::PlugUnhandled(_) => EngineError::PlugUnhandled {
                shell: self.describe(shell),
            },
            ComputeError::Engine(inner) if inner.is_compute_error() => *inner,
            ComputeError::Engine(inner) => EngineError::Compute {
                shell: self.describe(shell),
                source: inner,
            },
            ComputeError::Other(source) => EngineError::Compute {
                shell: self.describe(shell),
                source,
            },
        }
    }

    /// Writes a value into the cache of a writable input.
    ///
    /// Dependent caches are not invalidated.
    pub fn set(&mut self, shell: PlugShell, value: Value) -> Result<(), EngineError> {
        let target = self.resolve_target(shell)?;
        let plug = self.plug_def(target)?;
        let reason = if !plug.attribute().has_flag(AttrFlags::WRITABLE) {
            Some("plug is not writable")
        } else if plug.provides_output() {
            Some("plug is an output")
        } else if self.effective_input(target).is_some() {
            Some("plug is connected")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(EngineError::NotWritable {
                shell: self.describe(shell),
                reason: reason.to_string(),
            });
        }
        debug_assert!(!plug.attribute().has_flag(AttrFlags::UNCACHED));
        self.set_cache(target, value)
    }

    pub fn compatibility_rating(&self, shell: PlugShell, value: &Value) -> Result<u8, EngineError> {
        Ok(self
            .attribute(shell)?
            .compatibility_rating(value, &self.types))
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    pub fn has_cache(&self, shell: PlugShell) -> bool {
        matches!(self.cached(shell), Ok(Some(_)))
    }

    /// The cached value, or [`EngineError::NoCache`].
    pub fn cache(&self, shell: PlugShell) -> Result<Value, EngineError> {
        self.cached(shell)?.ok_or_else(|| EngineError::NoCache {
            shell: self.describe(shell),
        })
    }

    /// Stores a value after rating it. Uncached plugs ignore the call.
    pub fn set_cache(&mut self, shell: PlugShell, value: Value) -> Result<(), EngineError> {
        let target = self.resolve_target(shell)?;
        let attribute = self.attribute(target)?;
        if attribute.compatibility_rating(&value, &self.types) == 0 {
            return Err(EngineError::IncompatibleValue {
                shell: self.describe(shell),
                got: self.types.name_of(value.type_id()).to_string(),
            });
        }
        if attribute.has_flag(AttrFlags::UNCACHED) {
            return Ok(());
        }
        let weak = attribute.has_flag(AttrFlags::WEAK_CACHE);
        self.store(target, value, weak)
    }

    pub fn clear_cache(&mut self, shell: PlugShell) -> Result<(), EngineError> {
        let target = self.resolve_target(shell)?;
        self.entry_mut(target.node)?.cache.remove(&target.plug);
        Ok(())
    }

    /// Drops every cache of a node.
    pub fn clear_node_caches(&mut self, node: NodeId) -> Result<(), EngineError> {
        self.entry_mut(node)?.cache.clear();
        Ok(())
    }

    /// Clears the caches of every shell downstream of `shell`, excluding
    /// `shell` itself. The usual follow-up to [`set`](Self::set).
    ///
    /// Unlike a plain [`iter_plugs`] walk this crosses facades: a facade
    /// shell continues into the shell it wraps and a wrapped shell continues
    /// into the facade shell standing in for it, so copies held by graph
    /// facades are reached as well.
    pub fn clear_downstream_caches(&mut self, shell: PlugShell) -> Result<(), EngineError> {
        let held_by = self.resolve_target(shell)?;
        let options = TraversalOptions::down().visit_once();

        let mut roots = vec![shell];
        let mut seen = HashSet::from([shell]);
        let mut reached = Vec::new();
        while let Some(root) = roots.pop() {
            for downstream in iter_plugs(self, root, options, |_| false, |_| false) {
                let aliases = [self.resolve_target(downstream).ok(), self.facade_of(downstream)];
                for alias in aliases.into_iter().flatten() {
                    if seen.insert(alias) {
                        roots.push(alias);
                    }
                }
                reached.push(downstream);
            }
        }

        let mut cleared = HashSet::new();
        for downstream in reached {
            let target = self.resolve_target(downstream)?;
            if target != held_by && cleared.insert(target) {
                self.clear_cache(target)?;
            }
        }
        Ok(())
    }

    fn cached(&self, shell: PlugShell) -> Result<Option<Value>, EngineError> {
        let target = self.resolve_target(shell)?;
        let entry = self.entry(target.node)?;
        Ok(entry.cache.get(&target.plug).and_then(CacheSlot::load))
    }

    fn store(&mut self, shell: PlugShell, value: Value, weak: bool) -> Result<(), EngineError> {
        self.entry_mut(shell.node)?
            .cache
            .insert(shell.plug, CacheSlot::store(value, weak));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Connects `src -> dst` and returns `src`.
    ///
    /// `force` replaces an existing input of `dst`; without it a fed
    /// destination is an error. Connecting an existing edge again is a no-op.
    pub fn connect(
        &mut self,
        src: PlugShell,
        dst: PlugShell,
        force: bool,
    ) -> Result<PlugShell, EngineError> {
        let affinity = self
            .attribute(src)?
            .connection_affinity(self.attribute(dst)?, &self.types);
        if affinity == 0 {
            return Err(EngineError::Incompatible {
                from: self.describe(src),
                to: self.describe(dst),
            });
        }
        if self.connections.has_edge(src, dst) {
            return Ok(src);
        }
        if let Some(existing) = self.connections.input(dst) {
            if !force {
                return Err(EngineError::AlreadyConnected {
                    to: self.describe(dst),
                    existing: self.describe(existing),
                });
            }
            self.connections.remove_edge(existing, dst);
            tracing::debug!(
                "forced {}: dropped input from {}",
                self.describe(dst),
                self.describe(existing)
            );
        }
        self.connections.add_edge(src, dst);
        tracing::debug!(
            "connected {} -> {} (affinity {})",
            self.describe(src),
            self.describe(dst),
            affinity
        );
        Ok(src)
    }

    /// Removes `src -> dst` if it exists.
    pub fn disconnect(&mut self, src: PlugShell, dst: PlugShell) -> bool {
        let removed = self.connections.remove_edge(src, dst);
        if removed {
            tracing::debug!("disconnected {} -> {}", self.describe(src), self.describe(dst));
        }
        removed
    }

    /// The raw connection feeding `shell`, ignoring facades.
    pub fn input(&self, shell: PlugShell) -> Option<PlugShell> {
        self.connections.input(shell)
    }

    /// Shells fed by `shell` that satisfy `predicate`, in connection order.
    pub fn outputs<F>(&self, shell: PlugShell, mut predicate: F) -> Vec<PlugShell>
    where
        F: FnMut(PlugShell) -> bool,
    {
        self.connections
            .successors(shell)
            .into_iter()
            .filter(|&s| predicate(s))
            .collect()
    }

    /// The source a pull of `shell` reads from.
    ///
    /// A facade wrapping the shell is asked first, so the outermost
    /// connection wins; otherwise the shell's own connection is used.
    pub fn effective_input(&self, shell: PlugShell) -> Option<PlugShell> {
        if let Some(&facade) = self.overrides.get(&shell) {
            if let Some(src) = self.effective_input(facade) {
                tracing::trace!(
                    "override: {} reads {} through {}",
                    self.describe(shell),
                    self.describe(src),
                    self.describe(facade)
                );
                return Some(src);
            }
        }
        self.connections.input(shell)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn entry(&self, id: NodeId) -> Result<&NodeEntry, EngineError> {
        self.nodes.get(&id).ok_or(EngineError::NodeNotFound { id })
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, EngineError> {
        self.nodes.get_mut(&id).ok_or(EngineError::NodeNotFound { id })
    }

    fn missing_plug(&self, shell: PlugShell) -> EngineError {
        let node_type = self
            .nodes
            .get(&shell.node)
            .map(|e| e.schema.type_name().to_string())
            .unwrap_or_default();
        EngineError::Core(CoreError::PlugNotFound {
            node_type,
            name: format!("#{}", shell.plug),
        })
    }

    pub(crate) fn check_name(&self, name: &str) -> Result<(), EngineError> {
        if self.names.contains_key(name) {
            return Err(EngineError::DuplicateNodeName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub(crate) fn insert_entry(&mut self, id: NodeId, entry: NodeEntry) {
        self.names.insert(entry.name.clone(), id);
        self.nodes.insert(id, entry);
    }

    /// Follows facade tables down to the shell that holds the value.
    pub(crate) fn resolve_target(&self, shell: PlugShell) -> Result<PlugShell, EngineError> {
        let mut current = shell;
        loop {
            let entry = self.entry(current.node)?;
            let NodeKind::Facade(state) = &entry.kind else {
                return Ok(current);
            };
            let io = state.plugs.get(current.plug.index()).ok_or_else(|| {
                EngineError::AttributeNotFound {
                    facade: entry.name.clone(),
                    name: format!("#{}", current.plug),
                }
            })?;
            current = io.target();
        }
    }
}
