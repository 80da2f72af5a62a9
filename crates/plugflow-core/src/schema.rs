//! Node schemas: the per-node-type plug registry.
//!
//! A [`NodeSchema`] lists the plugs of one node type in declaration order and
//! records the internal `affects` edges between them. It is built once,
//! usually through [`NodeSchema::builder`], and then shared by every node of
//! that type behind an `Arc`.
//!
//! ```
//! use plugflow_core::{Attribute, NodeSchema, TypeId};
//!
//! let schema = NodeSchema::builder("Scale")
//!     .plug("input", Attribute::new(TypeId::FLOAT).writable().with_default(1.0))
//!     .plug("factor", Attribute::new(TypeId::FLOAT).writable().with_default(2.0))
//!     .plug("output", Attribute::new(TypeId::FLOAT))
//!     .affects("input", "output")
//!     .affects("factor", "output")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.input_plugs().count(), 2);
//! assert_eq!(schema.output_plugs().count(), 1);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::attribute::Attribute;
use crate::error::CoreError;
use crate::id::PlugId;
use crate::plug::Plug;

/// Most plugs one schema can declare; plug ids are `u16`.
pub const MAX_PLUGS: usize = u16::MAX as usize + 1;

/// Ordered set of plugs of one node type.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSchema {
    type_name: String,
    plugs: Vec<Plug>,
    by_name: IndexMap<String, PlugId>,
}

impl NodeSchema {
    /// Creates an empty schema. Prefer [`NodeSchema::builder`] for static
    /// declarations.
    pub fn new(type_name: &str) -> Self {
        NodeSchema {
            type_name: type_name.to_string(),
            plugs: Vec::new(),
            by_name: IndexMap::new(),
        }
    }

    pub fn builder(type_name: &str) -> NodeSchemaBuilder {
        NodeSchemaBuilder {
            schema: NodeSchema::new(type_name),
            error: None,
        }
    }

    /// Declares a plug. Names are unique per schema.
    pub fn add_plug(&mut self, name: &str, attribute: Attribute) -> Result<PlugId, CoreError> {
        if self.by_name.contains_key(name) {
            return Err(CoreError::DuplicatePlugName {
                node_type: self.type_name.clone(),
                name: name.to_string(),
            });
        }
        attribute.validate(name)?;

        let id = u16::try_from(self.plugs.len())
            .map(PlugId)
            .map_err(|_| CoreError::TooManyPlugs {
                node_type: self.type_name.clone(),
                limit: MAX_PLUGS,
            })?;
        self.plugs.push(Plug::new(id, name.to_string(), attribute));
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Records that `from` affects `to`, updating both plugs. Idempotent.
    pub fn add_affects(&mut self, from: PlugId, to: PlugId) -> Result<(), CoreError> {
        self.check(from)?;
        self.check(to)?;
        self.plugs[from.index()].add_affects(to);
        self.plugs[to.index()].add_affected_by(from);
        Ok(())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn plugs(&self) -> &[Plug] {
        &self.plugs
    }

    pub fn plug(&self, id: PlugId) -> Option<&Plug> {
        self.plugs.get(id.index())
    }

    pub fn plug_id(&self, name: &str) -> Option<PlugId> {
        self.by_name.get(name).copied()
    }

    pub fn plug_by_name(&self, name: &str) -> Option<&Plug> {
        self.plug_id(name).and_then(|id| self.plug(id))
    }

    /// Resolves a plug name, failing with [`CoreError::PlugNotFound`].
    pub fn resolve(&self, name: &str) -> Result<PlugId, CoreError> {
        self.plug_id(name).ok_or_else(|| CoreError::PlugNotFound {
            node_type: self.type_name.clone(),
            name: name.to_string(),
        })
    }

    /// Mutable access for flag toggles before the schema is shared.
    pub fn attribute_mut(&mut self, id: PlugId) -> Option<&mut Attribute> {
        self.plugs.get_mut(id.index()).map(Plug::attribute_mut)
    }

    pub fn input_plugs(&self) -> impl Iterator<Item = &Plug> {
        self.plugs.iter().filter(|p| p.provides_input())
    }

    pub fn output_plugs(&self) -> impl Iterator<Item = &Plug> {
        self.plugs.iter().filter(|p| p.provides_output())
    }

    pub fn len(&self) -> usize {
        self.plugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugs.is_empty()
    }

    fn check(&self, id: PlugId) -> Result<(), CoreError> {
        if self.plug(id).is_none() {
            return Err(CoreError::PlugNotFound {
                node_type: self.type_name.clone(),
                name: format!("#{id}"),
            });
        }
        Ok(())
    }
}

/// Fluent builder for [`NodeSchema`]. The first error is kept and reported by
/// [`build`](NodeSchemaBuilder::build).
#[derive(Debug)]
pub struct NodeSchemaBuilder {
    schema: NodeSchema,
    error: Option<CoreError>,
}

impl NodeSchemaBuilder {
    pub fn plug(mut self, name: &str, attribute: Attribute) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.schema.add_plug(name, attribute) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Declares an internal dependency by plug name. May reference plugs
    /// declared later, as long as they exist by the time it runs.
    pub fn affects(mut self, from: &str, to: &str) -> Self {
        if self.error.is_none() {
            let result = self
                .schema
                .resolve(from)
                .and_then(|f| self.schema.resolve(to).map(|t| (f, t)))
                .and_then(|(f, t)| self.schema.add_affects(f, t));
            if let Err(err) = result {
                self.error = Some(err);
            }
        }
        self
    }

    /// Finishes the schema, keeping it mutable.
    pub fn finish(self) -> Result<NodeSchema, CoreError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.schema),
        }
    }

    /// Finishes and freezes the schema for sharing.
    pub fn build(self) -> Result<Arc<NodeSchema>, CoreError> {
        self.finish().map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttrFlags;
    use crate::type_id::TypeId;

    fn float() -> Attribute {
        Attribute::new(TypeId::FLOAT)
    }

    #[test]
    fn builder_declares_plugs_in_order() {
        let schema = NodeSchema::builder("Add")
            .plug("a", float().writable())
            .plug("b", float().writable())
            .plug("sum", float())
            .affects("a", "sum")
            .affects("b", "sum")
            .build()
            .unwrap();

        let names: Vec<&str> = schema.plugs().iter().map(Plug::name).collect();
        assert_eq!(names, vec!["a", "b", "sum"]);
        assert_eq!(schema.plug_id("sum"), Some(PlugId(2)));

        let sum = schema.plug_by_name("sum").unwrap();
        assert_eq!(sum.affected_by(), &[PlugId(0), PlugId(1)]);
        assert!(sum.provides_output());
    }

    #[test]
    fn plug_ids_run_out_instead_of_wrapping() {
        let mut schema = NodeSchema::new("Wide");
        for idx in 0..MAX_PLUGS {
            schema.add_plug(&format!("p{idx}"), float()).unwrap();
        }
        assert_eq!(schema.plug_id("p65535"), Some(PlugId(u16::MAX)));

        let err = schema.add_plug("one_more", float()).unwrap_err();
        assert!(matches!(err, CoreError::TooManyPlugs { limit: MAX_PLUGS, .. }));
        assert_eq!(schema.plugs().len(), MAX_PLUGS);
        assert_eq!(schema.plug_id("one_more"), None);
    }

    #[test]
    fn duplicate_plug_name_errors() {
        let result = NodeSchema::builder("Twice")
            .plug("x", float())
            .plug("x", float())
            .build();
        assert_eq!(
            result.unwrap_err(),
            CoreError::DuplicatePlugName {
                node_type: "Twice".into(),
                name: "x".into()
            }
        );
    }

    #[test]
    fn unknown_plug_in_affects_errors() {
        let result = NodeSchema::builder("Broken")
            .plug("x", float())
            .affects("x", "missing")
            .build();
        assert!(matches!(result, Err(CoreError::PlugNotFound { name, .. }) if name == "missing"));
    }

    #[test]
    fn invalid_attribute_is_rejected() {
        let result = NodeSchema::builder("Lossy")
            .plug("x", float().writable().uncached())
            .build();
        assert!(matches!(result, Err(CoreError::InvalidAttribute { .. })));
    }

    #[test]
    fn affects_can_be_added_after_more_plugs() {
        let mut schema = NodeSchema::builder("Late")
            .plug("in", float())
            .plug("out", float())
            .finish()
            .unwrap();
        let input = schema.resolve("in").unwrap();
        let output = schema.resolve("out").unwrap();
        assert!(!schema.plug(input).unwrap().provides_input());

        schema.add_affects(input, output).unwrap();
        assert!(schema.plug(input).unwrap().provides_input());
        assert!(schema.plug(output).unwrap().provides_output());
    }

    #[test]
    fn attribute_mut_toggles_flags() {
        let mut schema = NodeSchema::builder("Toggle").plug("x", float()).finish().unwrap();
        let id = schema.resolve("x").unwrap();
        schema.attribute_mut(id).unwrap().set_flag(AttrFlags::COMPUTABLE, true);
        assert!(schema.plug(id).unwrap().provides_output());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::type_id::TypeId;
    use proptest::prelude::*;

    proptest! {
        /// No plug is ever classified as both input and output, whatever the
        /// edge set and flags.
        #[test]
        fn classification_is_exclusive(
            plug_count in 1usize..8,
            edges in proptest::collection::vec((0usize..8, 0usize..8), 0..20),
            computable in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let mut schema = NodeSchema::new("Random");
            for idx in 0..plug_count {
                let mut attr = Attribute::new(TypeId::ANY);
                if computable[idx] {
                    attr = attr.computable();
                }
                schema.add_plug(&format!("p{idx}"), attr).unwrap();
            }
            for (from, to) in edges {
                let from = PlugId((from % plug_count) as u16);
                let to = PlugId((to % plug_count) as u16);
                schema.add_affects(from, to).unwrap();
            }
            for plug in schema.plugs() {
                prop_assert!(!(plug.provides_input() && plug.provides_output()));
            }
        }
    }
}
