//! Runtime value representation.
//!
//! [`Value`] is the dynamic counterpart of the class hierarchy in
//! [`TypeRegistry`](crate::TypeRegistry). Every plug read produces a `Value`,
//! every write consumes one, and attributes rate values by their runtime
//! class.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::type_id::TypeId;

/// A value stored in a plug cache or flowing through a connection.
///
/// - Scalars: `Bool`, `Int`, `Float`, `Str`, plus `None`
/// - Compound: `List`, `Map` (insertion-ordered)
/// - `Type` holds a class itself, for class-valued attributes
/// - `Object` is an instance of a registered class behind a shared handle, so
///   large payloads are not copied when a cache hands them out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Type(TypeId),
    Object(Arc<Object>),
}

/// An instance of a user-registered class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub class: TypeId,
    pub fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new(class: TypeId) -> Self {
        Object {
            class,
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Value {
    /// Wraps an [`Object`] in a shared handle.
    pub fn object(object: Object) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Returns the runtime class of this value.
    ///
    /// A `Type` value is itself an instance of the `type` class.
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::None => TypeId::NONE,
            Value::Bool(_) => TypeId::BOOL,
            Value::Int(_) => TypeId::INT,
            Value::Float(_) => TypeId::FLOAT,
            Value::Str(_) => TypeId::STR,
            Value::List(_) => TypeId::LIST,
            Value::Map(_) => TypeId::MAP,
            Value::Type(_) => TypeId::TYPE,
            Value::Object(obj) => obj.class,
        }
    }

    /// Returns a human-readable description of the value's variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Type(_) => "Type",
            Value::Object(_) => "Object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Numeric view: floats as-is, integers widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<TypeId> {
        match self {
            Value::Type(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<Object>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Identity comparison: objects compare by handle, everything else by
    /// value.
    pub fn same_handle(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_type_ids() {
        assert_eq!(Value::None.type_id(), TypeId::NONE);
        assert_eq!(Value::from(true).type_id(), TypeId::BOOL);
        assert_eq!(Value::from(3).type_id(), TypeId::INT);
        assert_eq!(Value::from(2.5).type_id(), TypeId::FLOAT);
        assert_eq!(Value::from("x").type_id(), TypeId::STR);
        assert_eq!(Value::Type(TypeId::FLOAT).type_id(), TypeId::TYPE);
    }

    #[test]
    fn object_reports_its_class() {
        let obj = Object::new(TypeId(12)).with_field("radius", 1.5);
        let value = Value::from(obj);
        assert_eq!(value.type_id(), TypeId(12));
        assert_eq!(
            value.as_object().and_then(|o| o.field("radius")),
            Some(&Value::Float(1.5))
        );
    }

    #[test]
    fn as_float_widens_ints() {
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::Str("2".into()).as_float(), None);
    }

    #[test]
    fn same_handle_distinguishes_equal_objects() {
        let a = Value::object(Object::new(TypeId::ANY));
        let b = Value::object(Object::new(TypeId::ANY));
        assert_eq!(a, b);
        assert!(!a.same_handle(&b));
        assert!(a.same_handle(&a.clone()));
    }

    #[test]
    fn serde_roundtrip() {
        let value = Value::List(vec![
            Value::Int(1),
            Value::Type(TypeId::FLOAT),
            Value::object(Object::new(TypeId(9)).with_field("n", 2)),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
