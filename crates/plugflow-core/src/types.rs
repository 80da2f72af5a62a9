//! Type descriptors for attributes.
//!
//! A [`TypeSpec`] is either a single class or a composite signature. Composite
//! signatures describe the shape of list and map values (for instance the
//! return shape of a compute), while ratings still work on their base class.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::type_id::{TypeId, TypeRegistry};
use crate::value::Value;

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeSpec {
    /// A single class; values of the class or any subclass fit.
    Concrete(TypeId),

    /// Fixed-length list whose items match the given specs positionally.
    Sequence(Vec<TypeSpec>),

    /// Map that must contain every listed key with a matching value.
    Mapping(IndexMap<String, TypeSpec>),
}

impl TypeSpec {
    /// The class ratings are computed against.
    pub fn base_type(&self) -> TypeId {
        match self {
            TypeSpec::Concrete(ty) => *ty,
            TypeSpec::Sequence(_) => TypeId::LIST,
            TypeSpec::Mapping(_) => TypeId::MAP,
        }
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, TypeSpec::Concrete(_))
    }

    /// Returns `true` if `value` has the shape this spec describes.
    ///
    /// Nested concrete entries accept subclasses.
    pub fn matches_shape(&self, value: &Value, registry: &TypeRegistry) -> bool {
        match self {
            TypeSpec::Concrete(ty) => registry.is_subclass(value.type_id(), *ty),
            TypeSpec::Sequence(items) => match value {
                Value::List(values) if values.len() == items.len() => items
                    .iter()
                    .zip(values)
                    .all(|(spec, v)| spec.matches_shape(v, registry)),
                _ => false,
            },
            TypeSpec::Mapping(fields) => match value {
                Value::Map(map) => fields.iter().all(|(key, spec)| {
                    map.get(key)
                        .is_some_and(|v| spec.matches_shape(v, registry))
                }),
                _ => false,
            },
        }
    }
}

impl From<TypeId> for TypeSpec {
    fn from(ty: TypeId) -> Self {
        TypeSpec::Concrete(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_types() {
        assert_eq!(TypeSpec::from(TypeId::FLOAT).base_type(), TypeId::FLOAT);
        assert_eq!(TypeSpec::Sequence(vec![]).base_type(), TypeId::LIST);
        assert_eq!(TypeSpec::Mapping(IndexMap::new()).base_type(), TypeId::MAP);
    }

    #[test]
    fn sequence_shape_is_positional() {
        let reg = TypeRegistry::new();
        let spec = TypeSpec::Sequence(vec![TypeId::INT.into(), TypeId::STR.into()]);

        assert!(spec.matches_shape(&Value::List(vec![1.into(), "a".into()]), &reg));
        // bool derives from int
        assert!(spec.matches_shape(&Value::List(vec![true.into(), "a".into()]), &reg));
        assert!(!spec.matches_shape(&Value::List(vec!["a".into(), 1.into()]), &reg));
        assert!(!spec.matches_shape(&Value::List(vec![1.into()]), &reg));
    }

    #[test]
    fn mapping_shape_requires_keys() {
        let reg = TypeRegistry::new();
        let spec = TypeSpec::Mapping(IndexMap::from([("count".to_string(), TypeId::INT.into())]));

        let good = Value::Map(IndexMap::from([
            ("count".to_string(), Value::Int(3)),
            ("extra".to_string(), Value::None),
        ]));
        let missing = Value::Map(IndexMap::new());

        assert!(spec.matches_shape(&good, &reg));
        assert!(!spec.matches_shape(&missing, &reg));
        assert!(!spec.matches_shape(&Value::Int(3), &reg));
    }
}
