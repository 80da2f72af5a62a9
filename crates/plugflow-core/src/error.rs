//! Core error types for plugflow-core.
//!
//! Uses `thiserror` for structured, matchable variants covering failures
//! while declaring classes, attributes and node schemas.

use crate::type_id::TypeId;
use thiserror::Error;

/// Errors produced while building the static data model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Attempting to register a class name that already exists in the registry.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// A TypeId was not found in the type registry.
    #[error("type not found: TypeId({id})", id = id.0)]
    TypeNotFound { id: TypeId },

    /// A node schema declares the same plug name twice.
    #[error("duplicate plug '{name}' on node type '{node_type}'")]
    DuplicatePlugName { node_type: String, name: String },

    /// A schema ran out of plug ids.
    #[error("node type '{node_type}' cannot declare more than {limit} plugs")]
    TooManyPlugs { node_type: String, limit: usize },

    /// A plug name or id could not be resolved on a node type.
    #[error("plug not found: '{name}' on node type '{node_type}'")]
    PlugNotFound { node_type: String, name: String },

    /// An attribute carries a contradictory flag combination.
    #[error("invalid attribute on plug '{plug}': {reason}")]
    InvalidAttribute { plug: String, reason: String },
}
