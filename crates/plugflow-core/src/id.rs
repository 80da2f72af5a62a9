//! Stable ID newtypes for graph entities.
//!
//! IDs are distinct newtype wrappers so that a `NodeId` cannot be used where a
//! `PlugId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier, unique within one dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Plug identifier: the index of a plug inside its [`NodeSchema`](crate::NodeSchema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlugId(pub u16);

impl PlugId {
    /// Position of the plug in its schema's plug list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlugId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
