//! TypeId and TypeRegistry for nominal class identity.
//!
//! Every class known to an engine session has a unique [`TypeId`]. The
//! [`TypeRegistry`] records a single-inheritance hierarchy, so attribute
//! ratings can measure how far below a declared type a value's class sits.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Unique identifier for a class in the type registry.
///
/// The inner value is an index into the [`TypeRegistry`]'s class vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Pre-registered TypeId constants for built-in classes.
impl TypeId {
    pub const ANY: TypeId = TypeId(0);
    pub const NONE: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const FLOAT: TypeId = TypeId(4);
    pub const STR: TypeId = TypeId(5);
    pub const LIST: TypeId = TypeId(6);
    pub const MAP: TypeId = TypeId(7);
    pub const TYPE: TypeId = TypeId(8);
}

/// One registered class: its name and optional base class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<TypeId>,
}

/// Registry of all classes of a session, providing nominal identity via
/// [`TypeId`] and single inheritance.
///
/// On construction, the registry pre-registers the 9 built-in classes:
/// - `TypeId(0)` = any (root of every chain)
/// - `TypeId(1)` = none
/// - `TypeId(2)` = int
/// - `TypeId(3)` = bool (derives from int)
/// - `TypeId(4)` = float
/// - `TypeId(5)` = str
/// - `TypeId(6)` = list
/// - `TypeId(7)` = map
/// - `TypeId(8)` = type (the class of classes)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    /// Classes indexed by TypeId.0
    classes: Vec<ClassInfo>,
    /// Name lookup for every class, built-ins included
    names: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Number of built-in classes pre-registered on construction.
    const BUILTIN_COUNT: u32 = 9;

    /// Creates a new registry with the built-in classes pre-registered.
    pub fn new() -> Self {
        let builtins = [
            ("any", None),
            ("none", Some(TypeId::ANY)),
            ("int", Some(TypeId::ANY)),
            ("bool", Some(TypeId::INT)),
            ("float", Some(TypeId::ANY)),
            ("str", Some(TypeId::ANY)),
            ("list", Some(TypeId::ANY)),
            ("map", Some(TypeId::ANY)),
            ("type", Some(TypeId::ANY)),
        ];

        let mut classes = Vec::with_capacity(builtins.len());
        let mut names = HashMap::new();
        for (idx, (name, parent)) in builtins.into_iter().enumerate() {
            classes.push(ClassInfo {
                name: name.to_string(),
                parent,
            });
            names.insert(name.to_string(), TypeId(idx as u32));
        }
        debug_assert_eq!(classes.len() as u32, Self::BUILTIN_COUNT);

        TypeRegistry { classes, names }
    }

    /// Registers a named class deriving from `parent`.
    ///
    /// Returns [`CoreError::DuplicateTypeName`] if the name is taken and
    /// [`CoreError::TypeNotFound`] if `parent` is unknown.
    pub fn register_class(&mut self, name: &str, parent: TypeId) -> Result<TypeId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        if self.get(parent).is_none() {
            return Err(CoreError::TypeNotFound { id: parent });
        }
        let id = TypeId(self.classes.len() as u32);
        self.classes.push(ClassInfo {
            name: name.to_string(),
            parent: Some(parent),
        });
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a class by its [`TypeId`].
    pub fn get(&self, id: TypeId) -> Option<&ClassInfo> {
        self.classes.get(id.0 as usize)
    }

    /// Looks up a class's [`TypeId`] by name.
    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// Returns the class name, or `"?"` for ids this registry never issued.
    pub fn name_of(&self, id: TypeId) -> &str {
        self.get(id).map_or("?", |info| info.name.as_str())
    }

    /// Returns the resolution chain of `id`: the class itself, then each base
    /// class up to `any`. Unknown ids produce an empty chain.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|_| id);
        while let Some(ty) = current {
            chain.push(ty);
            // Parents are always registered before their children, so the
            // walk strictly decreases and terminates.
            current = self.get(ty).and_then(|info| info.parent);
        }
        chain
    }

    /// Returns `true` if `child` is `parent` or derives from it.
    pub fn is_subclass(&self, child: TypeId, parent: TypeId) -> bool {
        self.ancestors(child).contains(&parent)
    }

    /// Number of registered classes, built-ins included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// A registry is never empty; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_has_9_builtin_classes() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.len(), 9);
        assert_eq!(reg.get_by_name("float"), Some(TypeId::FLOAT));
        assert_eq!(reg.get_by_name("type"), Some(TypeId::TYPE));
    }

    #[test]
    fn bool_derives_from_int() {
        let reg = TypeRegistry::new();
        assert_eq!(
            reg.ancestors(TypeId::BOOL),
            vec![TypeId::BOOL, TypeId::INT, TypeId::ANY]
        );
        assert!(reg.is_subclass(TypeId::BOOL, TypeId::INT));
        assert!(!reg.is_subclass(TypeId::INT, TypeId::BOOL));
    }

    #[test]
    fn register_class_builds_chain() {
        let mut reg = TypeRegistry::new();
        let shape = reg.register_class("Shape", TypeId::ANY).unwrap();
        let mesh = reg.register_class("Mesh", shape).unwrap();

        assert_eq!(shape, TypeId(9));
        assert_eq!(mesh, TypeId(10));
        assert_eq!(reg.ancestors(mesh), vec![mesh, shape, TypeId::ANY]);
        assert_eq!(reg.name_of(mesh), "Mesh");
    }

    #[test]
    fn duplicate_name_returns_error() {
        let mut reg = TypeRegistry::new();
        reg.register_class("Foo", TypeId::ANY).unwrap();

        match reg.register_class("Foo", TypeId::ANY) {
            Err(CoreError::DuplicateTypeName { name }) => assert_eq!(name, "Foo"),
            other => panic!("expected DuplicateTypeName error, got {:?}", other),
        }
        assert!(matches!(
            reg.register_class("int", TypeId::ANY),
            Err(CoreError::DuplicateTypeName { .. })
        ));
    }

    #[test]
    fn unknown_parent_returns_error() {
        let mut reg = TypeRegistry::new();
        assert_eq!(
            reg.register_class("Orphan", TypeId(999)),
            Err(CoreError::TypeNotFound { id: TypeId(999) })
        );
    }

    #[test]
    fn unknown_id_has_empty_chain() {
        let reg = TypeRegistry::new();
        assert!(reg.ancestors(TypeId(999)).is_empty());
        assert_eq!(reg.name_of(TypeId(999)), "?");
    }

    #[test]
    fn type_id_display() {
        assert_eq!(format!("{}", TypeId(42)), "TypeId(42)");
    }

    #[test]
    fn serde_roundtrip() {
        let mut reg = TypeRegistry::new();
        reg.register_class("Test", TypeId::ANY).unwrap();

        let json = serde_json::to_string(&reg).unwrap();
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();

        assert_eq!(back.len(), reg.len());
        assert_eq!(back.get_by_name("Test"), Some(TypeId(9)));
    }
}
