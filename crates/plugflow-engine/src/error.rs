//! Engine error types.
//!
//! [`EngineError`] is what every graph operation returns. Shells are reported
//! as `node.plug` strings so messages stay readable after the graph changes.
//!
//! [`ComputeError`] is what a node's `compute` returns; the engine translates
//! it into an `EngineError` at the plug boundary.

use std::error::Error as StdError;

use plugflow_core::{CoreError, NodeId};

/// Boxed foreign error carried by [`EngineError::Compute`].
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors produced by graph, plug and facade operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    // -- connection errors --------------------------------------------------
    #[error("cannot connect {from} to {to}: incompatible attributes")]
    Incompatible { from: String, to: String },

    #[error("{to} is already connected to {existing}")]
    AlreadyConnected { to: String, existing: String },

    // -- access errors ------------------------------------------------------
    #[error("{shell} is not writable: {reason}")]
    NotWritable { shell: String, reason: String },

    #[error("{shell} is not readable")]
    NotReadable { shell: String },

    #[error("missing default value for unconnected input {shell}")]
    MissingDefault { shell: String },

    #[error("{shell} has no cached value")]
    NoCache { shell: String },

    #[error("value of type {got} is incompatible with {shell}")]
    IncompatibleValue { shell: String, got: String },

    // -- compute errors -----------------------------------------------------
    #[error("computing {shell} failed: {message}")]
    ComputeFailed { shell: String, message: String },

    #[error("node does not handle plug {shell}")]
    PlugUnhandled { shell: String },

    #[error("unexpected error while computing {shell}: {source}")]
    Compute {
        shell: String,
        #[source]
        source: BoxError,
    },

    #[error("pull of {shell} does not terminate (depth limit {limit})")]
    RecursionLimit { shell: String, limit: usize },

    // -- structural errors --------------------------------------------------
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    #[error("duplicate node name: '{name}'")]
    DuplicateNodeName { name: String },

    #[error("facade '{facade}' has no attribute '{name}'")]
    AttributeNotFound { facade: String, name: String },

    #[error("node '{node}' is not a facade")]
    NotAFacade { node: String },

    #[error("{shell} is already wrapped by facade '{facade}'")]
    AlreadyFacaded { shell: String, facade: String },

    #[error("ambiguous plugs for auto-wiring: {candidates:?} share rating {rating}")]
    AmbiguousPlugs { candidates: Vec<String>, rating: u8 },

    #[error("graphs do not share a type registry")]
    RegistryMismatch,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Returns `true` for errors raised while pulling a computed value.
    ///
    /// Callers that process many targets recover from these per target;
    /// everything else is a modeling error.
    pub fn is_compute_error(&self) -> bool {
        matches!(
            self,
            EngineError::ComputeFailed { .. }
                | EngineError::PlugUnhandled { .. }
                | EngineError::Compute { .. }
                | EngineError::MissingDefault { .. }
                | EngineError::RecursionLimit { .. }
        )
    }
}

/// Errors a [`Node::compute`](crate::Node::compute) implementation returns.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    /// The node cannot reach its computational goal with the current inputs.
    #[error("{0}")]
    Failed(String),

    /// The node was asked for a plug it does not compute.
    #[error("plug '{0}' is not handled")]
    PlugUnhandled(String),

    /// A nested pull failed; propagated unchanged.
    #[error(transparent)]
    Engine(Box<EngineError>),

    /// Any other failure; wrapped into [`EngineError::Compute`].
    #[error(transparent)]
    Other(BoxError),
}

impl ComputeError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComputeError::Failed(message.into())
    }

    pub fn unhandled(plug: &str) -> Self {
        ComputeError::PlugUnhandled(plug.to_string())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ComputeError::Other(Box::new(err))
    }
}

impl From<EngineError> for ComputeError {
    fn from(err: EngineError) -> Self {
        ComputeError::Engine(Box::new(err))
    }
}
