//! Plug descriptors.
//!
//! A [`Plug`] is declared once per node type and shared by every instance of
//! that type. Besides its [`Attribute`] it records the internal dependency
//! edges to other plugs of the same node type. Whether a plug is an input or
//! an output is never stored: it is derived from those edges on every call,
//! since edges may be added after the plug was declared.

use smallvec::SmallVec;

use crate::attribute::{AttrFlags, Attribute};
use crate::id::PlugId;

/// Plug id list; most plugs have only a handful of internal edges.
pub type PlugIds = SmallVec<[PlugId; 4]>;

/// A named, typed slot of a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct Plug {
    id: PlugId,
    name: String,
    attribute: Attribute,
    /// Plugs of the same node type whose value depends on this one.
    affects: PlugIds,
    /// Plugs of the same node type this one depends on.
    affected_by: PlugIds,
}

impl Plug {
    pub(crate) fn new(id: PlugId, name: String, attribute: Attribute) -> Self {
        Plug {
            id,
            name,
            attribute,
            affects: SmallVec::new(),
            affected_by: SmallVec::new(),
        }
    }

    pub fn id(&self) -> PlugId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub(crate) fn attribute_mut(&mut self) -> &mut Attribute {
        &mut self.attribute
    }

    pub fn affects(&self) -> &[PlugId] {
        &self.affects
    }

    pub fn affected_by(&self) -> &[PlugId] {
        &self.affected_by
    }

    /// Outputs are plugs something else flows into, or explicitly computable
    /// plugs. Output classification wins over input classification.
    pub fn provides_output(&self) -> bool {
        !self.affected_by.is_empty() || self.attribute.has_flag(AttrFlags::COMPUTABLE)
    }

    /// Inputs are plugs that affect others and are not outputs themselves.
    pub fn provides_input(&self) -> bool {
        !self.affects.is_empty() && !self.provides_output()
    }

    pub(crate) fn add_affects(&mut self, target: PlugId) {
        if !self.affects.contains(&target) {
            self.affects.push(target);
        }
    }

    pub(crate) fn add_affected_by(&mut self, source: PlugId) {
        if !self.affected_by.contains(&source) {
            self.affected_by.push(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_id::TypeId;

    fn plug(id: u16, attribute: Attribute) -> Plug {
        Plug::new(PlugId(id), format!("p{id}"), attribute)
    }

    #[test]
    fn unlinked_plug_is_neither() {
        let p = plug(0, Attribute::new(TypeId::FLOAT));
        assert!(!p.provides_input());
        assert!(!p.provides_output());
    }

    #[test]
    fn computable_plug_is_output() {
        let p = plug(0, Attribute::new(TypeId::FLOAT).computable());
        assert!(p.provides_output());
        assert!(!p.provides_input());
    }

    #[test]
    fn edges_classify_both_ends() {
        let mut input = plug(0, Attribute::new(TypeId::FLOAT));
        let mut output = plug(1, Attribute::new(TypeId::FLOAT));
        input.add_affects(output.id());
        output.add_affected_by(input.id());

        assert!(input.provides_input());
        assert!(!input.provides_output());
        assert!(output.provides_output());
        assert!(!output.provides_input());
    }

    #[test]
    fn output_classification_wins() {
        // A plug in the middle of an internal chain affects and is affected.
        let mut middle = plug(1, Attribute::new(TypeId::FLOAT));
        middle.add_affected_by(PlugId(0));
        middle.add_affects(PlugId(2));
        assert!(middle.provides_output());
        assert!(!middle.provides_input());
    }

    #[test]
    fn edges_are_idempotent() {
        let mut p = plug(0, Attribute::new(TypeId::FLOAT));
        p.add_affects(PlugId(1));
        p.add_affects(PlugId(1));
        assert_eq!(p.affects(), &[PlugId(1)]);
    }
}
