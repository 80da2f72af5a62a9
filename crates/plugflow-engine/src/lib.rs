//! Lazy pull-based evaluation of plug dependency graphs.
//!
//! Nodes declare typed plugs through a [`NodeSchema`](plugflow_core::NodeSchema)
//! and compute their outputs on demand. A [`DepGraph`] owns the nodes, the
//! connections between their plugs and every cached value; pulling a plug
//! recursively pulls whatever it depends on.

pub mod config;
pub mod connection;
pub mod error;
pub mod facade;
pub mod graph;
pub mod node;
pub mod shell;
pub mod traverse;

// Re-export commonly used types
pub use config::EngineConfig;
pub use connection::ConnectionGraph;
pub use error::{BoxError, ComputeError, EngineError};
pub use facade::{FacadeKind, IoFacadePlug};
pub use graph::DepGraph;
pub use node::{filter_compatible_plugs, ComputeContext, Node, PlugMatch};
pub use shell::{Mode, PlugHandle, PlugShell};
pub use traverse::{iter_plugs, Direction, IterPlugs, Order, TraversalOptions};
